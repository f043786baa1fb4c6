//! Provider specific [`ModelProvider`](crate::model_provider::ModelProvider) implementations.
//!
//! Each submodule offers a concrete client that speaks a particular vendor's
//! API while conforming to the uniform streampilot contract.

pub mod anthropic;
