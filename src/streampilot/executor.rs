//! Remote action execution against the cluster management API.
//!
//! Each registered action name maps to exactly one HTTP call (method, path,
//! optional payload-shaping rule). The mapping is static configuration — the
//! endpoints belong to the managed system, not to the orchestration core.
//!
//! The critical contract here is failure normalization: no transport error
//! ever escapes [`RemoteExecutor::execute`]. Every outcome — timeout, refused
//! connection, 4xx/5xx, unparseable body — folds into an [`ActionOutcome`]
//! the model can observe and react to. A 2xx response with no body is a
//! normal result for some endpoints and is reported as success, never as an
//! error.

use crate::streampilot::action_registry::ValidatedArguments;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default deadline for a single action call.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Classification of a failed action execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The call exceeded its deadline.
    Timeout,
    /// The management server could not be reached.
    ConnectionUnavailable,
    /// The server answered with a non-success status code.
    RemoteRejected(u16),
    /// The request or the response was structurally unusable.
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::ConnectionUnavailable => write!(f, "connection unavailable"),
            FailureKind::RemoteRejected(status) => write!(f, "remote rejected (status {})", status),
            FailureKind::Malformed => write!(f, "malformed"),
        }
    }
}

/// Uniform result envelope for one action execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Success { payload: Value },
    Failure { kind: FailureKind, message: String },
}

impl ActionOutcome {
    /// Convenience constructor for a successful execution.
    pub fn success(payload: Value) -> Self {
        ActionOutcome::Success { payload }
    }

    /// Convenience constructor for a failed execution.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ActionOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success { .. })
    }
}

/// An outcome correlated back to the request that produced it.
///
/// The `request_id` is the provider-assigned token from the originating
/// action request; the orchestration loop attaches it so results can be fed
/// back in a stable order regardless of completion order.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub request_id: String,
    pub outcome: ActionOutcome,
}

/// Builds a request payload from validated arguments.
pub type PayloadShaper = fn(&ValidatedArguments) -> Value;

/// Static mapping from one action name to one HTTP call.
pub struct ActionBinding {
    method: Method,
    path: String,
    shape: Option<PayloadShaper>,
}

impl ActionBinding {
    /// A body-less GET binding.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            shape: None,
        }
    }

    /// A POST binding whose JSON body is built by `shape`.
    pub fn post(path: impl Into<String>, shape: PayloadShaper) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            shape: Some(shape),
        }
    }
}

/// Issues one network request per validated action and normalizes the result.
///
/// No internal retry: retry policy belongs to the caller, not here.
pub struct RemoteExecutor {
    client: Client,
    base_url: String,
    timeout: Duration,
    bindings: HashMap<String, ActionBinding>,
}

impl RemoteExecutor {
    /// Create an executor targeting `base_url` with the default deadline.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout: DEFAULT_ACTION_TIMEOUT,
            bindings: HashMap::new(),
        }
    }

    /// Override the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register the HTTP call behind an action name.
    pub fn bind(&mut self, name: impl Into<String>, binding: ActionBinding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Execute a validated action: exactly one request, one normalized outcome.
    ///
    /// This method never panics and never returns a transport error directly;
    /// see the module docs for the normalization rules.
    pub async fn execute(&self, name: &str, args: &ValidatedArguments) -> ActionOutcome {
        let binding = match self.bindings.get(name) {
            Some(binding) => binding,
            None => {
                return ActionOutcome::failure(
                    FailureKind::Malformed,
                    format!("no remote binding for action '{}'", name),
                );
            }
        };

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), binding.path);
        log::debug!("executing action '{}': {} {}", name, binding.method, url);

        let mut request = self.client.request(binding.method.clone(), &url);
        if let Some(shape) = binding.shape {
            request = request.json(&shape(args));
        }

        let response = match request.timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                log::warn!("action '{}' timed out after {:?}", name, self.timeout);
                return ActionOutcome::failure(
                    FailureKind::Timeout,
                    format!("deadline exceeded calling {}: {}", url, err),
                );
            }
            Err(err) if err.is_connect() => {
                log::warn!("action '{}' could not connect: {}", name, err);
                return ActionOutcome::failure(
                    FailureKind::ConnectionUnavailable,
                    format!("could not connect to {}: {}", url, err),
                );
            }
            Err(err) => {
                log::warn!("action '{}' transport error: {}", name, err);
                return ActionOutcome::failure(
                    FailureKind::ConnectionUnavailable,
                    format!("request to {} failed: {}", url, err),
                );
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return ActionOutcome::failure(
                    FailureKind::Malformed,
                    format!("failed to read response body: {}", err),
                );
            }
        };

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                format!("{} returned status {}", url, status.as_u16())
            } else {
                body
            };
            return ActionOutcome::failure(FailureKind::RemoteRejected(status.as_u16()), message);
        }

        // 204 / empty 2xx: expected for some endpoints, not a failure.
        if body.trim().is_empty() {
            return ActionOutcome::success(json!({ "acknowledged": true }));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(payload) => ActionOutcome::success(payload),
            Err(err) => ActionOutcome::failure(
                FailureKind::Malformed,
                format!("unparseable response body: {}", err),
            ),
        }
    }
}
