//! Binary entry point: wire the collaborators together and run the session.

use std::io;
use std::process;
use std::sync::Arc;

use streampilot::actions;
use streampilot::clients::anthropic::AnthropicClient;
use streampilot::executor::RemoteExecutor;
use streampilot::session;
use streampilot::{AgentConfig, Orchestrator};

#[tokio::main]
async fn main() {
    streampilot::init_logger();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("streampilot: {}", err);
            process::exit(1);
        }
    };

    let registry = match actions::default_registry() {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("streampilot: invalid action registry: {}", err);
            process::exit(1);
        }
    };

    let http = reqwest::Client::new();

    let mut provider = AnthropicClient::new(&config.api_key, &config.model)
        .with_base_url(config.anthropic_base_url.as_str())
        .with_max_tokens(config.max_model_tokens)
        .with_http_client(http.clone());
    if let Some(prompt) = &config.system_prompt {
        provider = provider.with_system_prompt(prompt.as_str());
    }

    let mut executor = RemoteExecutor::new(http, config.server_url.as_str())
        .with_timeout(config.action_timeout);
    actions::bind_all(&mut executor);
    for spec in registry.describe_all() {
        if !executor.has_binding(&spec.name) {
            eprintln!("streampilot: action '{}' has no remote binding", spec.name);
            process::exit(1);
        }
    }

    let mut orchestrator = Orchestrator::new(Arc::new(provider), registry, executor);
    if let Some(max_rounds) = config.max_rounds {
        orchestrator = orchestrator.with_max_rounds(max_rounds);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(err) = session::run_session(&mut orchestrator, stdin.lock(), stdout.lock()).await {
        eprintln!("streampilot: session i/o error: {}", err);
        process::exit(1);
    }
}
