//! Append-only conversation state.
//!
//! The turn log is the single shared resource of a session. It is owned and
//! mutated only by the orchestration loop, and the full ordered sequence is
//! replayed to the model provider on every invocation — no truncation,
//! summarization, or windowing happens here.

use crate::streampilot::executor::ActionResult;
use serde_json::Value;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
    ActionResults,
}

/// An action the model asked to have performed.
///
/// Ephemeral: produced by the provider, consumed within one orchestration
/// round, then folded into the turn log.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// Opaque correlation token assigned by the model provider.
    pub request_id: String,
    /// Must match a registered [`ActionSpec`](crate::action_registry::ActionSpec) name.
    pub action_name: String,
    /// Raw, not-yet-validated arguments.
    pub arguments: Value,
}

/// The payload of a turn.
#[derive(Debug, Clone)]
pub enum TurnContent {
    /// Plain user text.
    Text(String),
    /// A model reply. `raw` is the provider's verbatim content payload so the
    /// model's own tokens are replayed untouched on later invocations.
    ModelReply {
        raw: Value,
        requests: Vec<ActionRequest>,
    },
    /// Results for one batch of action requests, in request order.
    Results(Vec<ActionResult>),
}

/// One entry in the conversation history.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: TurnContent,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn model(raw: Value, requests: Vec<ActionRequest>) -> Self {
        Self {
            role: TurnRole::Model,
            content: TurnContent::ModelReply { raw, requests },
        }
    }

    pub fn action_results(results: Vec<ActionResult>) -> Self {
        Self {
            role: TurnRole::ActionResults,
            content: TurnContent::Results(results),
        }
    }
}

/// Ordered, append-only log of turns.
#[derive(Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1), order-preserving append.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// The full ordered log, used as-is for every model invocation.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
