//! End-to-end scenarios against a running agent service.
//!
//! Each test binds the full axum router on an ephemeral port and drives it
//! over real HTTP with the protocol client, the way a peer agent would.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use a2a_mesh::transport::jsonrpc::codes;
use a2a_mesh::{
    A2AClient, AgentCapabilities, AgentCard, FormPayload, Message, MeshError,
    PushNotificationConfig, TaskSendParams, TaskState, TaskUpdate,
};
use agentmesh_core::prelude::*;
use agentmesh_core::push::{PushClaims, RetryPolicy};

fn agent_card(url: &str) -> AgentCard {
    AgentCard {
        name: "test-agent".into(),
        url: url.parse().unwrap(),
        version: "1.0.0".into(),
        description: Some("test fixture agent".into()),
        provider: None,
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: true,
            state_transition_history: true,
        },
        authentication: None,
        default_input_modes: vec!["text".into()],
        default_output_modes: vec!["text".into()],
        skills: vec![],
    }
}

async fn start_service(
    executor: Arc<dyn TaskExecutor>,
    auth: Arc<dyn Authenticator>,
) -> String {
    let key = Arc::new(SigningKey::generate().expect("keygen"));
    let policy = RetryPolicy {
        max_retries: 2,
        initial_backoff: Duration::from_millis(20),
        attempt_timeout: Duration::from_secs(2),
        total_budget: Duration::from_secs(10),
    };
    let push = Arc::new(PushSender::new(key, "test-agent".into(), policy));
    let manager = Arc::new(TaskManager::new(
        Arc::new(TaskStore::new()),
        Arc::new(EventBroker::new()),
        push,
        executor,
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");

    let state = AppState::new(
        manager,
        Arc::new(McpSurface::new()),
        auth,
        agent_card(&base),
    );
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    base
}

/// Runs until canceled.
struct SleepyExecutor;

#[async_trait]
impl TaskExecutor for SleepyExecutor {
    async fn execute(
        &self,
        ctx: ExecutionContext,
        sink: EventSink,
    ) -> Result<(), ExecutorError> {
        sink.working().await;
        tokio::select! {
            _ = ctx.cancel.cancelled() => Err(ExecutorError::Canceled),
            _ = tokio::time::sleep(Duration::from_secs(3600)) => Ok(()),
        }
    }
}

// ── S1: simple send/complete ─────────────────────────────────

#[tokio::test]
async fn s1_send_and_complete() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    let task = client
        .send_task(TaskSendParams::new("t1", Message::user_text("hi")))
        .await
        .unwrap();

    assert_eq!(task.status.state, TaskState::Completed);
    assert_eq!(task.artifacts.len(), 1);
    assert_eq!(task.artifacts[0].parts.len(), 1);
    assert_eq!(task.artifacts[0].text_content(), "hi");
    assert_eq!(task.history.len(), 2);

    let fetched = client.get_task("t1", None).await.unwrap();
    assert_eq!(fetched.status.state, TaskState::Completed);
    assert_eq!(fetched.artifacts[0].text_content(), "hi");
}

// ── S2: streaming ────────────────────────────────────────────

#[tokio::test]
async fn s2_streaming_send() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    let mut stream = client
        .send_task_subscribe(TaskSendParams::new("t2", Message::user_text("stream me")))
        .await
        .unwrap();

    let mut saw_working = false;
    let mut final_state = None;
    while let Some(update) = stream.next().await {
        match update.unwrap() {
            TaskUpdate::Status(event) => {
                if event.status.state == TaskState::Working {
                    saw_working = true;
                }
                if event.is_final {
                    final_state = Some(event.status.state);
                    break;
                }
            }
            TaskUpdate::Artifact(_) => {}
        }
    }
    assert!(saw_working);
    assert_eq!(final_state, Some(TaskState::Completed));

    let task = client.get_task("t2", None).await.unwrap();
    assert_eq!(task.status.state, TaskState::Completed);
}

// ── S3: cancellation ─────────────────────────────────────────

#[tokio::test]
async fn s3_cancel_long_running_task() {
    let base = start_service(Arc::new(SleepyExecutor), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    let mut stream = client
        .send_task_subscribe(TaskSendParams::new("t3", Message::user_text("run forever")))
        .await
        .unwrap();

    // Observe working before canceling.
    let first = stream.next().await.unwrap().unwrap();
    match first {
        TaskUpdate::Status(event) => assert_eq!(event.status.state, TaskState::Working),
        other => panic!("expected working status, got {other:?}"),
    }

    let canceled = client.cancel_task("t3").await.unwrap();
    assert_eq!(canceled.status.state, TaskState::Canceled);

    // The stream delivers the final canceled event.
    let mut final_state = None;
    while let Some(update) = stream.next().await {
        if let TaskUpdate::Status(event) = update.unwrap() {
            if event.is_final {
                final_state = Some(event.status.state);
            }
        }
    }
    assert_eq!(final_state, Some(TaskState::Canceled));

    let task = client.get_task("t3", None).await.unwrap();
    assert_eq!(task.status.state, TaskState::Canceled);

    // Terminal is sticky for further sends.
    let err = client
        .send_task(TaskSendParams::new("t3", Message::user_text("more")))
        .await
        .unwrap_err();
    match err {
        MeshError::JsonRpc { code, .. } => assert_eq!(code, codes::TASK_TERMINAL),
        other => panic!("expected terminal error, got {other}"),
    }
}

// ── S4: input-required round trip ────────────────────────────

#[tokio::test]
async fn s4_form_round_trip() {
    let base = start_service(Arc::new(FormExecutor::default()), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    let suspended = client
        .send_task(TaskSendParams::new("t4", Message::user_text("book travel")))
        .await
        .unwrap();
    assert_eq!(suspended.status.state, TaskState::InputRequired);

    let form_message = suspended.status.message.expect("form request message");
    let payload = form_message
        .parts
        .iter()
        .find_map(FormPayload::from_part)
        .expect("data part carries a form");
    assert!(!payload.instructions.is_empty());

    let filled = FormPayload::new(
        payload.form,
        serde_json::json!({"value": "2026-03-01"}),
        payload.instructions,
    );
    let done = client
        .send_task(TaskSendParams::new(
            "t4",
            Message::user(vec![filled.into_part()]),
        ))
        .await
        .unwrap();

    assert_eq!(done.status.state, TaskState::Completed);
    // user msg, form request, filled msg, closing agent msg
    assert_eq!(done.history.len(), 4);
}

// ── S5: push delivery verifies against JWKS ──────────────────

#[tokio::test]
async fn s5_push_delivery_signed() {
    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&receiver)
        .await;

    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    let params = TaskSendParams {
        push_notification: Some(PushNotificationConfig {
            url: format!("{}/hook", receiver.uri()).parse().unwrap(),
            token: Some("corr-5".into()),
            authentication: None,
        }),
        ..TaskSendParams::new("t5", Message::user_text("notify me"))
    };
    client.send_task(params).await.unwrap();

    // Delivery happens off the request path; poll the receiver.
    let mut requests = Vec::new();
    for _ in 0..50 {
        requests = receiver.received_requests().await.unwrap();
        if !requests.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(requests.len(), 1, "exactly one delivery expected");

    let request = &requests[0];
    let bearer = request
        .headers
        .get("authorization")
        .expect("authorization header")
        .to_str()
        .unwrap()
        .strip_prefix("Bearer ")
        .expect("bearer scheme")
        .to_string();

    // The body is the task snapshot.
    let body: a2a_mesh::Task = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body.id, "t5");
    assert_eq!(body.status.state, TaskState::Completed);

    // The JWT's kid resolves in the served JWKS document.
    let jwks: agentmesh_core::push::Jwks = reqwest::get(format!("{base}/.well-known/jwks.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let kid = decode_header(&bearer).unwrap().kid.expect("kid header");
    let jwk = jwks.find(&kid).expect("kid resolves in JWKS");
    let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).unwrap();
    let claims = decode::<PushClaims>(&bearer, &key, &Validation::new(Algorithm::RS256))
        .unwrap()
        .claims;
    assert_eq!(claims.iss, "test-agent");
}

// ── S6: resubscribe after a gap ──────────────────────────────

#[tokio::test]
async fn s6_resubscribe_replays_current_status() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    // Run the task to completion, then reattach.
    client
        .send_task(TaskSendParams::new("t6", Message::user_text("hi")))
        .await
        .unwrap();

    let mut stream = client.resubscribe("t6").await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    match first {
        TaskUpdate::Status(event) => {
            assert_eq!(event.status.state, TaskState::Completed);
            assert!(event.is_final);
        }
        other => panic!("expected synthesized status, got {other:?}"),
    }
}

// ── Transport-level behaviors ────────────────────────────────

#[tokio::test]
async fn batch_requests_dispatch_in_order() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;
    let http = reqwest::Client::new();

    let batch = serde_json::json!([
        {
            "jsonrpc": "2.0",
            "method": "tasks/send",
            "params": {
                "id": "tb1",
                "message": {"role": "user", "parts": [{"type": "text", "text": "a"}]}
            },
            "id": 1
        },
        // Notification: produces no response slot.
        {
            "jsonrpc": "2.0",
            "method": "tasks/get",
            "params": {"id": "tb1"}
        },
        {"jsonrpc": "2.0", "method": "no/such", "id": 3}
    ]);

    let responses: Vec<serde_json::Value> = http
        .post(format!("{base}/rpc"))
        .json(&batch)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["id"], "tb1");
    assert_eq!(responses[1]["id"], 3);
    assert_eq!(responses[1]["error"]["code"], -32601);
}

#[tokio::test]
async fn malformed_body_yields_parse_error() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;
    let http = reqwest::Client::new();

    let response: serde_json::Value = http
        .post(format!("{base}/rpc"))
        .body("{not json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], serde_json::Value::Null);
}

#[tokio::test]
async fn auth_gate_rejects_without_credentials() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(ApiKeyAuth::new("sekrit"))).await;
    let http = reqwest::Client::new();

    let status = http
        .post(format!("{base}/rpc"))
        .json(&serde_json::json!({"jsonrpc": "2.0", "method": "tasks/get", "params": {"id": "x"}, "id": 1}))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, 401);

    // Discovery documents stay public.
    let card_status = reqwest::get(format!("{base}/.well-known/agent.json"))
        .await
        .unwrap()
        .status();
    assert_eq!(card_status, 200);

    // The protocol client carries the key.
    let client = A2AClient::new(&base).unwrap().with_api_key("sekrit");
    let task = client
        .send_task(TaskSendParams::new("ta", Message::user_text("hi")))
        .await
        .unwrap();
    assert_eq!(task.status.state, TaskState::Completed);
}

#[tokio::test]
async fn agent_card_is_discoverable() {
    let base = start_service(Arc::new(EchoExecutor), Arc::new(NoAuth)).await;

    let card = AgentCard::discover(&base).await.unwrap();
    assert_eq!(card.name, "test-agent");
    assert!(card.capabilities.streaming);
    assert!(card.capabilities.push_notifications);
}

#[tokio::test]
async fn push_config_set_and_get() {
    let base = start_service(Arc::new(SleepyExecutor), Arc::new(NoAuth)).await;
    let client = A2AClient::new(&base).unwrap();

    let mut stream = client
        .send_task_subscribe(TaskSendParams::new("tp", Message::user_text("go")))
        .await
        .unwrap();
    stream.next().await;

    assert!(client.get_push_notification("tp").await.unwrap().is_none());

    let config = PushNotificationConfig {
        url: "http://127.0.0.1:9/tp".parse().unwrap(),
        token: None,
        authentication: None,
    };
    let stored = client
        .set_push_notification("tp", config.clone())
        .await
        .unwrap();
    assert_eq!(stored, config);
    assert_eq!(
        client.get_push_notification("tp").await.unwrap(),
        Some(config)
    );

    client.cancel_task("tp").await.unwrap();
}
