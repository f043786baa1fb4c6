//! State-machine tests for the orchestration loop, driven by a scripted
//! provider so every transition is deterministic.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use streampilot::actions;
use streampilot::conversation::{ActionRequest, TurnContent, TurnRole};
use streampilot::session;
use streampilot::{
    ActionOutcome, FailureKind, ModelProvider, ModelReply, Orchestrator, OrchestratorError,
    ProviderError, RemoteExecutor, TurnOutcome,
};

/// Provider that plays back a fixed list of replies, one per invocation.
struct ScriptedProvider {
    replies: Mutex<Vec<Result<ModelReply, ProviderError>>>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<ModelReply, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn invoke(
        &self,
        _history: &[streampilot::ConversationTurn],
        _actions: &[streampilot::ActionSpec],
    ) -> Result<ModelReply, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop()
            .expect("script exhausted: unexpected extra invocation")
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn text_reply(segments: &[&str]) -> ModelReply {
    let blocks: Vec<Value> = segments
        .iter()
        .map(|s| json!({ "type": "text", "text": s }))
        .collect();
    ModelReply {
        segments: segments.iter().map(|s| s.to_string()).collect(),
        requests: Vec::new(),
        raw: Value::Array(blocks),
    }
}

fn action_reply(requests: Vec<(&str, &str, Value)>) -> ModelReply {
    let blocks: Vec<Value> = requests
        .iter()
        .map(|(id, name, input)| {
            json!({ "type": "tool_use", "id": id, "name": name, "input": input })
        })
        .collect();
    ModelReply {
        segments: Vec::new(),
        requests: requests
            .into_iter()
            .map(|(id, name, input)| ActionRequest {
                request_id: id.to_string(),
                action_name: name.to_string(),
                arguments: input,
            })
            .collect(),
        raw: Value::Array(blocks),
    }
}

fn empty_reply() -> ModelReply {
    ModelReply {
        segments: Vec::new(),
        requests: Vec::new(),
        raw: json!([]),
    }
}

/// Executor with no bindings, for tests that must never reach the network.
fn offline_executor() -> RemoteExecutor {
    RemoteExecutor::new(reqwest::Client::new(), "http://127.0.0.1:1")
}

fn bound_executor(url: &str) -> RemoteExecutor {
    let mut executor = RemoteExecutor::new(reqwest::Client::new(), url);
    actions::bind_all(&mut executor);
    executor
}

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    executor: RemoteExecutor,
) -> Orchestrator {
    Orchestrator::new(provider, actions::default_registry().unwrap(), executor)
}

#[tokio::test]
async fn test_text_segments_concatenate_in_order() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply(&["A", "B"]))]));
    let mut orch = orchestrator(provider.clone(), offline_executor());

    let outcome = orch.handle_message("hello").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Answer("AB".to_string()));
    assert_eq!(provider.calls(), 1);

    // One user turn, one model turn; back at AwaitingUser.
    let history = orch.conversation().history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, TurnRole::User);
    assert_eq!(history[1].role, TurnRole::Model);
}

#[tokio::test]
async fn test_batch_results_fold_into_one_turn_in_request_order() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .expect(3)
        .create_async()
        .await;

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(action_reply(vec![
            ("toolu_1", "check_health", json!({})),
            ("toolu_2", "check_health", json!({})),
            ("toolu_3", "check_health", json!({})),
        ])),
        Ok(text_reply(&["all healthy"])),
    ]));
    let mut orch = orchestrator(provider.clone(), bound_executor(&server.url()));

    let outcome = orch.handle_message("status of everything?").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Answer("all healthy".to_string()));
    assert_eq!(provider.calls(), 2);

    // user, model(requests), actionResults, model(answer)
    let history = orch.conversation().history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].role, TurnRole::ActionResults);
    match &history[2].content {
        TurnContent::Results(results) => {
            assert_eq!(results.len(), 3);
            let ids: Vec<&str> = results.iter().map(|r| r.request_id.as_str()).collect();
            assert_eq!(ids, vec!["toolu_1", "toolu_2", "toolu_3"]);
            assert!(results.iter().all(|r| r.outcome.is_success()));
        }
        other => panic!("unexpected content: {:?}", other),
    }
}

#[tokio::test]
async fn test_one_failing_action_does_not_abort_the_batch() {
    let mut server = mockito::Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;
    let _topics = server
        .mock("GET", "/api/topics")
        .with_status(500)
        .create_async()
        .await;

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(action_reply(vec![
            ("toolu_a", "list_topics", json!({})),
            ("toolu_b", "check_health", json!({})),
        ])),
        Ok(text_reply(&["partial"])),
    ]));
    let mut orch = orchestrator(provider, bound_executor(&server.url()));

    orch.handle_message("check things").await.unwrap();

    match &orch.conversation().history()[2].content {
        TurnContent::Results(results) => {
            assert!(!results[0].outcome.is_success());
            assert!(results[1].outcome.is_success());
        }
        other => panic!("unexpected content: {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_failure_leaves_user_turn_only() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(
        ProviderError::Connection("refused".to_string()),
    )]));
    let mut orch = orchestrator(provider, offline_executor());

    let err = orch.handle_message("hello").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Provider(_)));

    let history = orch.conversation().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, TurnRole::User);
}

#[tokio::test]
async fn test_runaway_guard_trips_on_cycle_after_max() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    // Three action replies: two cycles allowed, the third request trips.
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(action_reply(vec![("t1", "check_health", json!({}))])),
        Ok(action_reply(vec![("t2", "check_health", json!({}))])),
        Ok(action_reply(vec![("t3", "check_health", json!({}))])),
    ]));
    let mut orch =
        orchestrator(provider.clone(), bound_executor(&server.url())).with_max_rounds(2);

    let err = orch.handle_message("loop forever").await.unwrap_err();
    match err {
        OrchestratorError::RunawayLoop { rounds } => assert_eq!(rounds, 2),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_empty_reply_surfaces_no_response() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(empty_reply())]));
    let mut orch = orchestrator(provider, offline_executor());

    let outcome = orch.handle_message("hello?").await.unwrap();
    assert_eq!(outcome, TurnOutcome::NoResponse);
    // Nothing worth replaying: only the user turn is in history.
    assert_eq!(orch.conversation().len(), 1);
}

#[tokio::test]
async fn test_unknown_action_becomes_malformed_failure() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(action_reply(vec![("t1", "nuke_cluster", json!({}))])),
        Ok(text_reply(&["that action does not exist"])),
    ]));
    let mut orch = orchestrator(provider, offline_executor());

    let outcome = orch.handle_message("nuke it").await.unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Answer("that action does not exist".to_string())
    );

    match &orch.conversation().history()[2].content {
        TurnContent::Results(results) => match &results[0].outcome {
            ActionOutcome::Failure { kind, message } => {
                assert_eq!(*kind, FailureKind::Malformed);
                assert!(message.contains("Unknown action"));
            }
            other => panic!("expected failure, got {:?}", other),
        },
        other => panic!("unexpected content: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_arguments_become_malformed_failure() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(action_reply(vec![(
            "t1",
            "produce_message",
            json!({ "topic": "orders" }),
        )])),
        Ok(text_reply(&["missing the value"])),
    ]));
    let mut orch = orchestrator(provider, offline_executor());

    orch.handle_message("send it").await.unwrap();

    match &orch.conversation().history()[2].content {
        TurnContent::Results(results) => match &results[0].outcome {
            ActionOutcome::Failure { kind, message } => {
                assert_eq!(*kind, FailureKind::Malformed);
                assert!(message.contains("value"));
            }
            other => panic!("expected failure, got {:?}", other),
        },
        other => panic!("unexpected content: {:?}", other),
    }
}

#[tokio::test]
async fn test_mixed_reply_keeps_text_in_replayed_payload() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let mut mixed = action_reply(vec![("t1", "check_health", json!({}))]);
    mixed
        .raw
        .as_array_mut()
        .unwrap()
        .insert(0, json!({ "type": "text", "text": "Checking now." }));
    mixed.segments.push("Checking now.".to_string());

    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(mixed),
        Ok(text_reply(&["done"])),
    ]));
    let mut orch = orchestrator(provider, bound_executor(&server.url()));

    orch.handle_message("check").await.unwrap();

    // The model turn replays both the text block and the tool_use block.
    match &orch.conversation().history()[1].content {
        TurnContent::ModelReply { raw, requests } => {
            assert_eq!(raw.as_array().unwrap().len(), 2);
            assert_eq!(requests.len(), 1);
        }
        other => panic!("unexpected content: {:?}", other),
    }
}

#[tokio::test]
async fn test_session_exit_token_is_case_insensitive() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply(&["hi there"]))]));
    let mut orch = orchestrator(provider.clone(), offline_executor());

    let input = Cursor::new(b"hello\nQUIT\n".to_vec());
    let mut output = Vec::new();
    session::run_session(&mut orch, input, &mut output)
        .await
        .unwrap();

    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("hi there"));
    assert!(printed.contains("bye."));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_session_forwards_empty_lines_as_content() {
    let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_reply(&["yes?"]))]));
    let mut orch = orchestrator(provider.clone(), offline_executor());

    let input = Cursor::new(b"\nquit\n".to_vec());
    let mut output = Vec::new();
    session::run_session(&mut orch, input, &mut output)
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(orch.conversation().history()[0].role, TurnRole::User);
}

#[tokio::test]
async fn test_session_survives_provider_failure() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Err(ProviderError::RateLimited),
        Ok(text_reply(&["recovered"])),
    ]));
    let mut orch = orchestrator(provider.clone(), offline_executor());

    let input = Cursor::new(b"first\nsecond\nquit\n".to_vec());
    let mut output = Vec::new();
    session::run_session(&mut orch, input, &mut output)
        .await
        .unwrap();

    let printed = String::from_utf8(output).unwrap();
    assert!(printed.contains("[error]"));
    assert!(printed.contains("recovered"));
    assert_eq!(provider.calls(), 2);
}
