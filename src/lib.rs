//! # streampilot
//!
//! streampilot is a conversational agent for a message-streaming cluster: it
//! takes free-text user input, sends it to an LLM provider together with a
//! declared set of management actions, executes the actions the model
//! requests against the cluster's HTTP management API, feeds the results
//! back, and repeats until the model produces a plain-language answer.
//!
//! The crate provides carefully layered abstractions for:
//!
//! * **Action declaration**: [`action_registry`] holds the static capability
//!   set advertised to the model and validates its requests before dispatch
//! * **Remote execution**: [`executor`] maps validated actions to single HTTP
//!   calls and normalizes every transport outcome into a uniform result
//! * **Conversation state**: [`conversation`] keeps the ordered, append-only
//!   turn log replayed to the model on every invocation
//! * **Orchestration**: [`Orchestrator`] runs the model/action feedback loop
//!   until the model yields a final answer
//! * **Provider flexibility**: the [`model_provider::ModelProvider`] trait
//!   with an Anthropic Messages implementation in [`clients::anthropic`]
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use streampilot::actions;
//! use streampilot::clients::anthropic::AnthropicClient;
//! use streampilot::executor::RemoteExecutor;
//! use streampilot::{Orchestrator, TurnOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = std::env::var("ANTHROPIC_API_KEY")?;
//!     let provider = Arc::new(AnthropicClient::new(&key, "claude-3-5-sonnet-20241022"));
//!
//!     let registry = actions::default_registry()?;
//!     let mut executor = RemoteExecutor::new(reqwest::Client::new(), "http://localhost:3000");
//!     actions::bind_all(&mut executor);
//!
//!     let mut orchestrator = Orchestrator::new(provider, registry, executor);
//!     match orchestrator.handle_message("is the cluster healthy?").await? {
//!         TurnOutcome::Answer(answer) => println!("{}", answer),
//!         TurnOutcome::NoResponse => println!("(no response produced)"),
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialize `env_logger` exactly once, no matter how many times this is
/// called.
///
/// # Example
///
/// ```rust
/// streampilot::init_logger();
/// streampilot::init_logger(); // safe, second call is a no-op
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(env_logger::init);
}

// Import the top-level `streampilot` module.
pub mod streampilot;

// Re-exporting key items for easier external access.
pub use crate::streampilot::action_registry;
pub use crate::streampilot::action_registry::{
    ActionParameter, ActionRegistry, ActionSpec, ParameterKind, RegistryError, ValidatedArguments,
};
pub use crate::streampilot::actions;
pub use crate::streampilot::clients;
pub use crate::streampilot::config;
pub use crate::streampilot::config::{AgentConfig, ConfigError};
pub use crate::streampilot::conversation;
pub use crate::streampilot::conversation::{
    ActionRequest, Conversation, ConversationTurn, TurnContent, TurnRole,
};
pub use crate::streampilot::executor;
pub use crate::streampilot::executor::{
    ActionBinding, ActionOutcome, ActionResult, FailureKind, RemoteExecutor,
};
pub use crate::streampilot::model_provider;
pub use crate::streampilot::model_provider::{ModelProvider, ModelReply, ProviderError};
pub use crate::streampilot::orchestrator;
pub use crate::streampilot::orchestrator::{Orchestrator, OrchestratorError, TurnOutcome};
pub use crate::streampilot::session;
