//! HTTP surface — JSON-RPC routing, SSE responses, and well-known documents.
//!
//! One `POST /rpc` endpoint carries every method. Streaming methods
//! (`tasks/sendSubscribe`, `tasks/resubscribe`) answer with a
//! `text/event-stream` body; everything else gets a JSON-RPC envelope.
//! Batch envelopes dispatch each element independently and return responses
//! in matching order (notifications produce no slot; streaming methods
//! cannot be batched).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use a2a_mesh::transport::jsonrpc::{
    is_streaming_method, mcp_methods, methods, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    RequestId, JSONRPC_VERSION,
};
use a2a_mesh::{
    AgentCard, TaskIdParams, TaskPushConfigParams, TaskQueryParams, TaskSendParams, TaskUpdate,
};

use crate::auth::{require_auth, Authenticator};
use crate::broker::update_stream;
use crate::config::ServerConfig;
use crate::manager::TaskManager;
use crate::mcp::McpSurface;

/// Interval between SSE comment heartbeats.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(25);

/// Shared state behind the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TaskManager>,
    pub mcp: Arc<McpSurface>,
    pub auth: Arc<dyn Authenticator>,
    pub card: Arc<AgentCard>,
    pub rpc_timeout: Duration,
}

impl AppState {
    pub fn new(
        manager: Arc<TaskManager>,
        mcp: Arc<McpSurface>,
        auth: Arc<dyn Authenticator>,
        card: AgentCard,
    ) -> Self {
        Self {
            manager,
            mcp,
            auth,
            card: Arc::new(card),
            rpc_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }
}

/// Build the agent service router.
///
/// `/rpc` and `/events` sit behind the auth gate; the well-known discovery
/// documents stay public.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/events", get(handle_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(protected)
        .route("/.well-known/agent.json", get(serve_agent_card))
        .route("/.well-known/jwks.json", get(serve_jwks))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "AgentMesh service listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── /rpc ─────────────────────────────────────────────────────

async fn handle_rpc(State(state): State<AppState>, body: String) -> Response {
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            return Json(JsonRpcResponse::error(
                RequestId::Null,
                JsonRpcError::parse_error(e.to_string()),
            ))
            .into_response()
        }
    };

    if let Value::Array(items) = value {
        return handle_batch(&state, items).await;
    }

    match parse_request(value) {
        Err(response) => Json(response).into_response(),
        Ok(request) if is_streaming_method(&request.method) => {
            handle_streaming(state, request).await
        }
        Ok(request) => {
            let notification = request.is_notification();
            let response = dispatch_single(&state, request).await;
            if notification {
                StatusCode::NO_CONTENT.into_response()
            } else {
                Json(response).into_response()
            }
        }
    }
}

async fn handle_batch(state: &AppState, items: Vec<Value>) -> Response {
    if items.is_empty() {
        return Json(JsonRpcResponse::error(
            RequestId::Null,
            JsonRpcError::invalid_request("empty batch"),
        ))
        .into_response();
    }

    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        match parse_request(item) {
            Err(response) => responses.push(response),
            Ok(request) if is_streaming_method(&request.method) => {
                let id = request.id.clone().unwrap_or(RequestId::Null);
                responses.push(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request("streaming methods cannot be batched"),
                ));
            }
            Ok(request) => {
                let notification = request.is_notification();
                let response = dispatch_single(state, request).await;
                if !notification {
                    responses.push(response);
                }
            }
        }
    }

    if responses.is_empty() {
        // All elements were notifications.
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(responses).into_response()
    }
}

/// Parse one envelope, or produce the error response for it.
fn parse_request(value: Value) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let id = value
        .get("id")
        .cloned()
        .and_then(|v| serde_json::from_value::<RequestId>(v).ok())
        .unwrap_or(RequestId::Null);

    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(id.clone(), JsonRpcError::invalid_request(e.to_string()))
    })?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
        ));
    }
    Ok(request)
}

async fn dispatch_single(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone().unwrap_or(RequestId::Null);
    let params = request.params.unwrap_or(Value::Null);

    let dispatched = tokio::time::timeout(
        state.rpc_timeout,
        dispatch_method(state, &request.method, params),
    )
    .await;

    match dispatched {
        Ok(Ok(result)) => JsonRpcResponse::success(id, result),
        Ok(Err(error)) => JsonRpcResponse::error(id, error),
        Err(_) => {
            tracing::warn!(method = %request.method, "RPC handler deadline exceeded");
            JsonRpcResponse::error(id, JsonRpcError::internal_error("request deadline exceeded"))
        }
    }
}

async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: Value,
) -> Result<Value, JsonRpcError> {
    match method {
        methods::SEND => {
            let params: TaskSendParams = parse_params(params)?;
            let task = state.manager.send(params).await?;
            Ok(serde_json::to_value(task).map_err(internal)?)
        }
        methods::GET => {
            let params: TaskQueryParams = parse_params(params)?;
            let task = state.manager.get(params).await?;
            Ok(serde_json::to_value(task).map_err(internal)?)
        }
        methods::CANCEL => {
            let params: TaskIdParams = parse_params(params)?;
            let task = state.manager.cancel(&params.id).await?;
            Ok(serde_json::to_value(task).map_err(internal)?)
        }
        methods::PUSH_SET => {
            let params: TaskPushConfigParams = parse_params(params)?;
            let stored = state.manager.set_push(params).await?;
            Ok(serde_json::to_value(stored).map_err(internal)?)
        }
        methods::PUSH_GET => {
            let params: TaskIdParams = parse_params(params)?;
            match state.manager.get_push(&params.id).await? {
                Some(stored) => Ok(serde_json::to_value(stored).map_err(internal)?),
                None => Ok(Value::Null),
            }
        }
        mcp_methods::TOOLS_LIST
        | mcp_methods::TOOLS_CALL
        | mcp_methods::PROMPTS_LIST
        | mcp_methods::PROMPTS_GET
        | mcp_methods::RESOURCES_LIST
        | mcp_methods::RESOURCES_GET
        | mcp_methods::SAMPLING_CREATE => Ok(state.mcp.dispatch(method, params).await?),
        other => Err(JsonRpcError::method_not_found(other)),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn internal(e: serde_json::Error) -> JsonRpcError {
    JsonRpcError::internal_error(e.to_string())
}

// ── Streaming responses ──────────────────────────────────────

async fn handle_streaming(state: AppState, request: JsonRpcRequest) -> Response {
    let id = request.id.clone().unwrap_or(RequestId::Null);
    let params = request.params.unwrap_or(Value::Null);

    let stream: Result<BoxStream<'static, TaskUpdate>, JsonRpcError> =
        match request.method.as_str() {
            methods::SEND_SUBSCRIBE => match parse_params::<TaskSendParams>(params) {
                Ok(params) => state
                    .manager
                    .send_subscribe(params)
                    .await
                    .map_err(JsonRpcError::from),
                Err(e) => Err(e),
            },
            methods::RESUBSCRIBE => match parse_params::<TaskIdParams>(params) {
                Ok(params) => state
                    .manager
                    .resubscribe(&params.id)
                    .await
                    .map_err(JsonRpcError::from),
                Err(e) => Err(e),
            },
            other => Err(JsonRpcError::method_not_found(other)),
        };

    match stream {
        Err(error) => Json(JsonRpcResponse::error(id, error)).into_response(),
        Ok(stream) => sse_response(stream),
    }
}

/// Wrap a task update stream as an SSE response with comment heartbeats.
fn sse_response(stream: BoxStream<'static, TaskUpdate>) -> Response {
    let events = stream.map(|update| {
        let data = serde_json::to_string(&update).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize task update");
            String::from("{}")
        });
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    let mut response = Sse::new(events)
        .keep_alive(
            KeepAlive::new()
                .interval(KEEP_ALIVE_INTERVAL)
                .text("heartbeat"),
        )
        .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

// ── /events firehose ─────────────────────────────────────────

async fn handle_events(State(state): State<AppState>) -> Response {
    let rx = state.manager.broker().subscribe_all();
    sse_response(update_stream(rx).boxed())
}

// ── Well-known documents ─────────────────────────────────────

async fn serve_agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json((*state.card).clone())
}

async fn serve_jwks(State(state): State<AppState>) -> Response {
    Json(state.manager.push_sender().signing_key().jwks()).into_response()
}
