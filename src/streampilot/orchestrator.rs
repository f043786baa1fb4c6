//! The orchestration loop.
//!
//! One user message drives a round through the state machine
//!
//! ```text
//! AwaitingUser → ModelInvoked → { ActionsPending, Completed }
//!                     ↑               │
//!                     └───────────────┘
//! ```
//!
//! On each round the provider is invoked with the full ordered turn history
//! and the complete capability set. A reply carrying action requests moves to
//! `ActionsPending`: every request in the batch is validated and executed
//! (independently — one failure never aborts the others), the results are
//! appended as a single turn in request order, and the model is invoked
//! again. A reply with no requests completes the round with the concatenated
//! text segments as the final answer.
//!
//! The loop is the error boundary for action execution: registry rejections
//! and transport failures fold into results the model can observe. Only
//! provider failures and the runaway-loop guard propagate to the caller, and
//! they leave the conversation state intact so the user can simply continue.

use crate::streampilot::action_registry::ActionRegistry;
use crate::streampilot::conversation::{ActionRequest, Conversation, ConversationTurn};
use crate::streampilot::executor::{ActionOutcome, ActionResult, FailureKind, RemoteExecutor};
use crate::streampilot::model_provider::{ModelProvider, ModelReply, ProviderError};
use futures_util::future::join_all;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// How a completed round surfaces to the session driver.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model produced a final text answer.
    Answer(String),
    /// The model produced neither text nor action requests. Surfaced
    /// explicitly rather than silently swallowed.
    NoResponse,
}

/// Errors that end a round without a final answer.
#[derive(Debug)]
pub enum OrchestratorError {
    /// The provider failed; the current user turn is abandoned but history
    /// keeps everything appended so far.
    Provider(ProviderError),
    /// The model kept requesting actions past the configured round limit.
    RunawayLoop { rounds: usize },
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::Provider(err) => write!(f, "{}", err),
            OrchestratorError::RunawayLoop { rounds } => write!(
                f,
                "model kept requesting actions after {} rounds; aborting the turn",
                rounds
            ),
        }
    }
}

impl Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OrchestratorError::Provider(err) => Some(err),
            OrchestratorError::RunawayLoop { .. } => None,
        }
    }
}

/// Drives the model/action feedback cycle for one sequential session.
///
/// Collaborator handles are constructed once at startup and passed in; the
/// orchestrator owns the conversation state and is its single writer.
pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    registry: ActionRegistry,
    executor: RemoteExecutor,
    conversation: Conversation,
    max_rounds: Option<usize>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: ActionRegistry,
        executor: RemoteExecutor,
    ) -> Self {
        Self {
            provider,
            registry,
            executor,
            conversation: Conversation::new(),
            max_rounds: None,
        }
    }

    /// Cap the number of action-execution cycles per user turn. There is no
    /// cap by default; the model decides when it is done.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// The turn log, for inspection.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Identifier of the model behind this orchestrator.
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Resolve one user message into a final outcome, running as many
    /// model/action cycles as the model asks for.
    pub async fn handle_message(
        &mut self,
        text: &str,
    ) -> Result<TurnOutcome, OrchestratorError> {
        self.conversation.append(ConversationTurn::user(text));

        let mut reply = self.invoke_model().await?;
        let mut rounds = 0usize;

        while reply.wants_actions() {
            if let Some(max) = self.max_rounds {
                if rounds >= max {
                    log::warn!("runaway guard tripped after {} action rounds", rounds);
                    return Err(OrchestratorError::RunawayLoop { rounds });
                }
            }
            rounds += 1;

            let requests = reply.requests.clone();
            log::info!(
                "model requested {} action(s): {}",
                requests.len(),
                requests
                    .iter()
                    .map(|r| r.action_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            // The raw reply goes into history verbatim before any execution,
            // so the model's own tokens are preserved for replay.
            self.conversation
                .append(ConversationTurn::model(reply.raw.clone(), reply.requests));

            let results = self.execute_batch(&requests).await;
            self.conversation
                .append(ConversationTurn::action_results(results));

            reply = self.invoke_model().await?;
        }

        let answer = reply.answer_text();
        if reply.has_payload() {
            self.conversation
                .append(ConversationTurn::model(reply.raw, Vec::new()));
        }

        if answer.is_empty() {
            Ok(TurnOutcome::NoResponse)
        } else {
            Ok(TurnOutcome::Answer(answer))
        }
    }

    async fn invoke_model(&self) -> Result<ModelReply, OrchestratorError> {
        self.provider
            .invoke(self.conversation.history(), self.registry.describe_all())
            .await
            .map_err(OrchestratorError::Provider)
    }

    /// Execute one batch of requests concurrently. `join_all` yields results
    /// in input order, so the assembled batch matches the model's emission
    /// order regardless of completion order.
    async fn execute_batch(&self, requests: &[ActionRequest]) -> Vec<ActionResult> {
        join_all(requests.iter().map(|request| self.resolve_request(request))).await
    }

    /// Validate and execute a single request. Registry rejections become
    /// synthetic failure results so a misbehaving model request never
    /// terminates the session.
    async fn resolve_request(&self, request: &ActionRequest) -> ActionResult {
        let args = match self
            .registry
            .validate(&request.action_name, &request.arguments)
        {
            Ok(args) => args,
            Err(err) => {
                log::warn!(
                    "rejected action request '{}' ({}): {}",
                    request.action_name,
                    request.request_id,
                    err
                );
                return ActionResult {
                    request_id: request.request_id.clone(),
                    outcome: ActionOutcome::failure(FailureKind::Malformed, err.to_string()),
                };
            }
        };

        let outcome = self.executor.execute(&request.action_name, &args).await;
        ActionResult {
            request_id: request.request_id.clone(),
            outcome,
        }
    }
}
