//! A2A client — speaks the task protocol to a remote agent.
//!
//! This is the delegation seam: an agent that wants to hand work to a peer
//! constructs a client from the peer's base URL (usually discovered through
//! the catalog), then calls [`A2AClient::delegate`] or the lower-level task
//! methods. Streaming delegation re-emits the peer's SSE events upward.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use url::Url;
use uuid::Uuid;

use crate::agent_card::AgentCard;
use crate::error::{MeshError, MeshResult};
use crate::message::Message;
use crate::notification::PushNotificationConfig;
use crate::params::{TaskIdParams, TaskPushConfigParams, TaskQueryParams, TaskSendParams};
use crate::task::Task;
use crate::transport::jsonrpc::{methods, JsonRpcRequest, JsonRpcResponse};
use crate::transport::sse::{self, TaskUpdateStream};

/// Client for a single remote A2A agent.
#[derive(Debug, Clone)]
pub struct A2AClient {
    /// Base URL of the remote agent.
    base_url: Url,

    /// The agent's `/rpc` endpoint.
    rpc_url: Url,

    /// The discovered agent card (populated after `discover()`).
    agent_card: Option<AgentCard>,

    /// HTTP client.
    http: Client,

    /// Optional bearer token attached to every request.
    auth_token: Option<String>,

    /// Optional API key attached to every request.
    api_key: Option<String>,
}

impl A2AClient {
    /// Create a new client for a remote agent.
    pub fn new(base_url: &str) -> MeshResult<Self> {
        let base_url = Url::parse(base_url)?;
        let rpc_url = Url::parse(&format!("{}/rpc", base_url.as_str().trim_end_matches('/')))?;
        Ok(Self {
            base_url,
            rpc_url,
            agent_card: None,
            http: Client::new(),
            auth_token: None,
            api_key: None,
        })
    }

    /// Create a client with a custom HTTP client.
    pub fn with_http_client(base_url: &str, http: Client) -> MeshResult<Self> {
        let mut client = Self::new(base_url)?;
        client.http = http;
        Ok(client)
    }

    /// Attach a bearer token.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Attach an API key (sent as `X-API-Key`).
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Discover the remote agent's capabilities by fetching its card.
    pub async fn discover(&mut self) -> MeshResult<&AgentCard> {
        let card = AgentCard::discover(self.base_url.as_str()).await?;
        self.agent_card = Some(card);
        Ok(self
            .agent_card
            .as_ref()
            .expect("agent card was just stored"))
    }

    /// Get the cached agent card (call `discover()` first).
    pub fn agent_card(&self) -> Option<&AgentCard> {
        self.agent_card.as_ref()
    }

    // ── Core Operations ──────────────────────────────────────

    /// Send a message, creating or continuing a task on the peer.
    pub async fn send_task(&self, params: TaskSendParams) -> MeshResult<Task> {
        let request = JsonRpcRequest::send(serde_json::to_value(&params)?);
        let response = self.send_rpc(request).await?;
        let result = response.into_result().map_err(MeshError::from)?;
        Ok(serde_json::from_value(result)?)
    }

    /// Delegate work to the peer: send a message under a fresh task id and
    /// return the peer's task snapshot.
    pub async fn delegate(&self, message: Message, parent_id: Option<String>) -> MeshResult<Task> {
        let params = TaskSendParams {
            parent_id,
            ..TaskSendParams::new(Uuid::new_v4().to_string(), message)
        };
        self.send_task(params).await
    }

    /// Get a task snapshot by id.
    pub async fn get_task(&self, id: &str, history_length: Option<i64>) -> MeshResult<Task> {
        let params = TaskQueryParams {
            id: id.to_string(),
            history_length,
        };
        let request = JsonRpcRequest::get(serde_json::to_value(&params)?);
        let response = self.send_rpc(request).await?;
        let result = response.into_result().map_err(MeshError::from)?;
        Ok(serde_json::from_value(result)?)
    }

    /// Cancel a task.
    pub async fn cancel_task(&self, id: &str) -> MeshResult<Task> {
        let request = JsonRpcRequest::cancel(id);
        let response = self.send_rpc(request).await?;
        let result = response.into_result().map_err(MeshError::from)?;
        Ok(serde_json::from_value(result)?)
    }

    // ── Streaming Operations ─────────────────────────────────

    /// Send a message and stream status/artifact updates as they occur.
    pub async fn send_task_subscribe(
        &self,
        params: TaskSendParams,
    ) -> MeshResult<TaskUpdateStream> {
        let request = JsonRpcRequest::send_subscribe(serde_json::to_value(&params)?);
        self.send_rpc_streaming(request).await
    }

    /// Re-attach to a task's update stream. The first event is a synthesized
    /// status update carrying the current status.
    pub async fn resubscribe(&self, id: &str) -> MeshResult<TaskUpdateStream> {
        let request = JsonRpcRequest::resubscribe(id);
        self.send_rpc_streaming(request).await
    }

    // ── Push Notification Operations ─────────────────────────

    /// Store a webhook configuration for a task on the peer.
    pub async fn set_push_notification(
        &self,
        id: &str,
        config: PushNotificationConfig,
    ) -> MeshResult<PushNotificationConfig> {
        let params = TaskPushConfigParams {
            id: id.to_string(),
            push_notification_config: config,
        };
        let request = JsonRpcRequest::new(methods::PUSH_SET, Some(serde_json::to_value(&params)?));
        let response = self.send_rpc(request).await?;
        let result = response.into_result().map_err(MeshError::from)?;
        let stored: TaskPushConfigParams = serde_json::from_value(result)?;
        Ok(stored.push_notification_config)
    }

    /// Retrieve the webhook configuration stored for a task, if any.
    pub async fn get_push_notification(
        &self,
        id: &str,
    ) -> MeshResult<Option<PushNotificationConfig>> {
        let params = TaskIdParams { id: id.to_string() };
        let request = JsonRpcRequest::new(methods::PUSH_GET, Some(serde_json::to_value(&params)?));
        let response = self.send_rpc(request).await?;
        let result = response.into_result().map_err(MeshError::from)?;
        if result.is_null() {
            return Ok(None);
        }
        let stored: TaskPushConfigParams = serde_json::from_value(result)?;
        Ok(Some(stored.push_notification_config))
    }

    // ── Internal Transport ───────────────────────────────────

    /// Send a JSON-RPC request to the peer's `/rpc` endpoint.
    async fn send_rpc(&self, request: JsonRpcRequest) -> MeshResult<JsonRpcResponse> {
        tracing::debug!(
            method = %request.method,
            url = %self.rpc_url,
            "Sending A2A request"
        );

        let response = self.apply_auth(self.http.post(self.rpc_url.clone()).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MeshError::Transport(
                response.error_for_status().unwrap_err(),
            ));
        }

        Ok(response.json().await?)
    }

    /// Send a streaming JSON-RPC request; the peer answers with SSE.
    async fn send_rpc_streaming(&self, request: JsonRpcRequest) -> MeshResult<TaskUpdateStream> {
        tracing::debug!(
            method = %request.method,
            url = %self.rpc_url,
            "Sending streaming A2A request"
        );

        let response = self
            .apply_auth(
                self.http
                    .post(self.rpc_url.clone())
                    .header("Accept", "text/event-stream")
                    .json(&request),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MeshError::Transport(
                response.error_for_status().unwrap_err(),
            ));
        }

        let stream = response.bytes_stream().eventsource().map(|item| match item {
            Ok(event) => sse::parse_update(&event.data),
            Err(e) => Err(MeshError::Streaming(format!("stream read error: {e}"))),
        });

        Ok(TaskUpdateStream::new(Box::pin(stream)))
    }

    fn apply_auth(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.auth_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref key) = self.api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task_json(id: &str, state: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "sessionId": "s1",
            "status": {"state": state, "timestamp": "2026-01-05T10:00:00Z"}
        })
    }

    #[tokio::test]
    async fn test_send_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(
                serde_json::json!({"method": "tasks/send"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "result": task_json("t1", "completed"),
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = A2AClient::new(&server.uri()).unwrap();
        let task = client
            .send_task(TaskSendParams::new("t1", Message::user_text("hi")))
            .await
            .unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "error": {"code": -32001, "message": "task not found"},
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = A2AClient::new(&server.uri()).unwrap();
        let err = client.get_task("missing", None).await.unwrap_err();
        match err {
            MeshError::JsonRpc { code, .. } => assert_eq!(code, -32001),
            other => panic!("expected JsonRpc error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_streaming_updates() {
        let body = concat!(
            "data: {\"id\":\"t2\",\"status\":{\"state\":\"working\",\"timestamp\":\"2026-01-05T10:00:00Z\"},\"final\":false}\n\n",
            ": heartbeat\n\n",
            "data: {\"id\":\"t2\",\"status\":{\"state\":\"completed\",\"timestamp\":\"2026-01-05T10:00:01Z\"},\"final\":true}\n\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = A2AClient::new(&server.uri()).unwrap();
        let mut stream = client
            .send_task_subscribe(TaskSendParams::new("t2", Message::user_text("go")))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.task_id(), "t2");
        assert!(!first.is_final());

        let second = stream.next().await.unwrap().unwrap();
        assert!(second.is_final());
    }

    #[tokio::test]
    async fn test_delegate_generates_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "result": task_json("generated", "working"),
                "id": 1
            })))
            .mount(&server)
            .await;

        let client = A2AClient::new(&server.uri()).unwrap();
        let task = client
            .delegate(Message::user_text("do this"), Some("parent-1".into()))
            .await
            .unwrap();
        assert_eq!(task.status.state, TaskState::Working);
    }
}
