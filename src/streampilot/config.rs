//! Startup configuration.
//!
//! A plain struct, filled from the environment at startup. Anything invalid
//! here is a fatal diagnostic before the session begins — configuration
//! errors never occur mid-session.

use std::error::Error;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAX_MODEL_TOKENS: u32 = 1024;
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Fatal configuration problems.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `ANTHROPIC_API_KEY` is not set.
    MissingApiKey,
    /// `STREAMPILOT_MAX_ROUNDS` is not a positive integer.
    InvalidMaxRounds(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingApiKey => write!(
                f,
                "ANTHROPIC_API_KEY is not set; export it before starting the agent"
            ),
            ConfigError::InvalidMaxRounds(raw) => {
                write!(f, "STREAMPILOT_MAX_ROUNDS must be a positive integer, got '{}'", raw)
            }
        }
    }
}

impl Error for ConfigError {}

/// Everything the agent needs at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Anthropic API key.
    pub api_key: String,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Base URL of the Messages endpoint.
    pub anthropic_base_url: String,
    /// Base URL of the cluster management API.
    pub server_url: String,
    /// Completion budget per model invocation.
    pub max_model_tokens: u32,
    /// Deadline for a single remote action call.
    pub action_timeout: Duration,
    /// Optional cap on action cycles per user turn (runaway guard).
    pub max_rounds: Option<usize>,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
}

impl AgentConfig {
    /// Read configuration from the environment.
    ///
    /// `ANTHROPIC_API_KEY` is required; everything else falls back to the
    /// defaults above. Recognized overrides: `STREAMPILOT_MODEL`,
    /// `STREAMPILOT_ANTHROPIC_BASE_URL`, `STREAMPILOT_SERVER_URL`,
    /// `STREAMPILOT_MAX_ROUNDS`, `STREAMPILOT_SYSTEM_PROMPT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        let max_rounds = match std::env::var("STREAMPILOT_MAX_ROUNDS") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(value) if value > 0 => Some(value),
                _ => return Err(ConfigError::InvalidMaxRounds(raw)),
            },
            Err(_) => None,
        };

        Ok(Self {
            api_key,
            model: env_or("STREAMPILOT_MODEL", DEFAULT_MODEL),
            anthropic_base_url: env_or(
                "STREAMPILOT_ANTHROPIC_BASE_URL",
                DEFAULT_ANTHROPIC_BASE_URL,
            ),
            server_url: env_or("STREAMPILOT_SERVER_URL", DEFAULT_SERVER_URL),
            max_model_tokens: DEFAULT_MAX_MODEL_TOKENS,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            max_rounds,
            system_prompt: std::env::var("STREAMPILOT_SYSTEM_PROMPT").ok(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
