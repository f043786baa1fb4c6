//! The model-provider seam.
//!
//! A [`ModelProvider`] turns the full ordered turn history plus the complete
//! capability set into one reply: final text, one or more action requests, or
//! a mixture of both. The orchestration loop is written entirely against this
//! trait, so swapping vendors only requires a different implementation — see
//! [`clients::anthropic`](crate::clients::anthropic) for the reference one.

use crate::streampilot::action_registry::ActionSpec;
use crate::streampilot::conversation::{ActionRequest, ConversationTurn};
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt;

/// One reply from the model.
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// Plain-text segments, in the order the model emitted them.
    pub segments: Vec<String>,
    /// Action requests, in the order the model emitted them. May coexist
    /// with text segments in the same reply.
    pub requests: Vec<ActionRequest>,
    /// The provider's verbatim content payload, replayed untouched when this
    /// reply is folded into the conversation history.
    pub raw: Value,
}

impl ModelReply {
    /// True when the reply asks for at least one action.
    pub fn wants_actions(&self) -> bool {
        !self.requests.is_empty()
    }

    /// All text segments concatenated in order.
    pub fn answer_text(&self) -> String {
        self.segments.concat()
    }

    /// True when the raw payload carries anything worth replaying.
    pub fn has_payload(&self) -> bool {
        match &self.raw {
            Value::Array(blocks) => !blocks.is_empty(),
            Value::Null => false,
            _ => true,
        }
    }
}

/// Failure modes surfaced by a provider.
///
/// These are never folded into action results: the orchestration loop lets
/// them propagate so the session driver can show a visible, non-fatal message
/// and return to awaiting user input.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider endpoint could not be reached.
    Connection(String),
    /// The provider throttled the request.
    RateLimited,
    /// The provider answered with a non-success status code.
    Status(u16, String),
    /// The provider's response could not be decoded.
    Malformed(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Connection(msg) => write!(f, "provider connection error: {}", msg),
            ProviderError::RateLimited => write!(f, "provider rate limit exceeded"),
            ProviderError::Status(code, msg) => {
                write!(f, "provider returned status {}: {}", code, msg)
            }
            ProviderError::Malformed(msg) => write!(f, "malformed provider response: {}", msg),
        }
    }
}

impl Error for ProviderError {}

/// Trait implemented by model-provider clients.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Invoke the model with the full turn history and the complete
    /// capability set. The provider requires the full set on every call;
    /// there is no incremental negotiation.
    async fn invoke(
        &self,
        history: &[ConversationTurn],
        actions: &[ActionSpec],
    ) -> Result<ModelReply, ProviderError>;

    /// Identifier of the underlying model, for logging and display.
    fn model_name(&self) -> &str;
}
