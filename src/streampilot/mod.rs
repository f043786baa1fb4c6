// src/streampilot/mod.rs

pub mod action_registry;
pub mod actions;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod executor;
pub mod model_provider;
pub mod orchestrator;
pub mod session;

// Explicitly export the loop entry points so callers reach them as
// streampilot::Orchestrator instead of streampilot::orchestrator::Orchestrator.
pub use orchestrator::{Orchestrator, TurnOutcome};
