//! MCP surface — tools, prompts, resources, and sampling.
//!
//! Served by the same JSON-RPC router as the task methods so an LLM
//! framework can use this agent as a tool host. These are side-channels:
//! none of the task engine depends on them. The sampling backend is an
//! injected capability; without one, `sampling/createMessage` reports an
//! unsupported operation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use a2a_mesh::transport::jsonrpc::mcp_methods;
use a2a_mesh::{A2AClient, Message};

use crate::error::{CoreError, CoreResult};

// ── Tools ────────────────────────────────────────────────────

/// A tool the agent exposes to LLM frameworks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// The name of the tool.
    pub name: String,

    /// A human-readable description of the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema describing the expected arguments.
    pub input_schema: Value,
}

type ToolHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, CoreResult<Value>> + Send + Sync>;

/// Registry of callable tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, (Tool, ToolHandler)>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its handler.
    pub async fn register<F, Fut>(&self, tool: Tool, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = CoreResult<Value>> + Send + 'static,
    {
        let handler: ToolHandler =
            Arc::new(move |args: Value| -> BoxFuture<'static, CoreResult<Value>> {
                Box::pin(handler(args))
            });
        let mut tools = self.tools.write().await;
        tools.insert(tool.name.clone(), (tool, handler));
    }

    /// List registered tools, sorted by name.
    pub async fn list(&self) -> Vec<Tool> {
        let tools = self.tools.read().await;
        let mut out: Vec<Tool> = tools.values().map(|(t, _)| t.clone()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Invoke a tool by name.
    pub async fn call(&self, name: &str, arguments: Value) -> CoreResult<Value> {
        let handler = {
            let tools = self.tools.read().await;
            tools
                .get(name)
                .map(|(_, h)| Arc::clone(h))
                .ok_or_else(|| CoreError::InvalidParams(format!("unknown tool: {name}")))?
        };
        handler(arguments).await
    }
}

// ── Prompts ──────────────────────────────────────────────────

/// A prompt template the agent exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// A named argument accepted by a prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptArgument {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,
}

type PromptHandler =
    Arc<dyn Fn(HashMap<String, String>) -> CoreResult<Vec<Message>> + Send + Sync>;

/// Registry of prompt templates.
#[derive(Default)]
pub struct PromptRegistry {
    prompts: RwLock<HashMap<String, (Prompt, PromptHandler)>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register<F>(&self, prompt: Prompt, render: F)
    where
        F: Fn(HashMap<String, String>) -> CoreResult<Vec<Message>> + Send + Sync + 'static,
    {
        let mut prompts = self.prompts.write().await;
        prompts.insert(prompt.name.clone(), (prompt, Arc::new(render)));
    }

    pub async fn list(&self) -> Vec<Prompt> {
        let prompts = self.prompts.read().await;
        let mut out: Vec<Prompt> = prompts.values().map(|(p, _)| p.clone()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Render a prompt with the supplied arguments.
    pub async fn get(&self, name: &str, arguments: HashMap<String, String>) -> CoreResult<Vec<Message>> {
        let render = {
            let prompts = self.prompts.read().await;
            prompts
                .get(name)
                .map(|(_, r)| Arc::clone(r))
                .ok_or_else(|| CoreError::InvalidParams(format!("unknown prompt: {name}")))?
        };
        render(arguments)
    }
}

// ── Resources ────────────────────────────────────────────────

/// A readable resource the agent exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Registry of static resources.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: RwLock<HashMap<String, (Resource, Value)>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, resource: Resource, contents: Value) {
        let mut resources = self.resources.write().await;
        resources.insert(resource.uri.clone(), (resource, contents));
    }

    pub async fn list(&self) -> Vec<Resource> {
        let resources = self.resources.read().await;
        let mut out: Vec<Resource> = resources.values().map(|(r, _)| r.clone()).collect();
        out.sort_by(|a, b| a.uri.cmp(&b.uri));
        out
    }

    pub async fn get(&self, uri: &str) -> CoreResult<Value> {
        let resources = self.resources.read().await;
        resources
            .get(uri)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| CoreError::InvalidParams(format!("unknown resource: {uri}")))
    }
}

// ── Sampling ─────────────────────────────────────────────────

/// The injected LLM sampling capability.
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn create_message(&self, params: Value) -> CoreResult<Value>;
}

// ── Surface ──────────────────────────────────────────────────

/// The complete MCP side-channel, dispatched by the JSON-RPC router.
#[derive(Default)]
pub struct McpSurface {
    pub tools: ToolRegistry,
    pub prompts: PromptRegistry,
    pub resources: ResourceRegistry,
    sampler: Option<Arc<dyn Sampler>>,
}

impl McpSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a sampling backend.
    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Register the built-in `delegate` tool: hands a message to a peer
    /// agent over A2A and returns the peer's task snapshot.
    pub async fn register_delegate_tool(&self) {
        let tool = Tool {
            name: "delegate".into(),
            description: Some(
                "Delegate a task to another agent by URL and return its task snapshot".into(),
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "agentUrl": { "type": "string", "description": "Base URL of the peer agent" },
                    "text": { "type": "string", "description": "The instruction to delegate" },
                    "parentId": { "type": "string", "description": "Optional parent task id" }
                },
                "required": ["agentUrl", "text"]
            }),
        };
        self.tools
            .register(tool, |args: Value| {
                async move {
                    let agent_url = args
                        .get("agentUrl")
                        .and_then(Value::as_str)
                        .ok_or_else(|| CoreError::InvalidParams("agentUrl is required".into()))?;
                    let text = args
                        .get("text")
                        .and_then(Value::as_str)
                        .ok_or_else(|| CoreError::InvalidParams("text is required".into()))?;
                    let parent_id = args
                        .get("parentId")
                        .and_then(Value::as_str)
                        .map(str::to_string);

                    let client = A2AClient::new(agent_url)?;
                    let task = client.delegate(Message::user_text(text), parent_id).await?;
                    Ok(serde_json::to_value(task)?)
                }
            })
            .await;
    }

    /// Dispatch an MCP method to the matching registry.
    pub async fn dispatch(&self, method: &str, params: Value) -> CoreResult<Value> {
        match method {
            mcp_methods::TOOLS_LIST => Ok(serde_json::json!({ "tools": self.tools.list().await })),
            mcp_methods::TOOLS_CALL => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CoreError::InvalidParams("tool name is required".into()))?;
                let arguments = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(Value::Object(Default::default()));
                let result = self.tools.call(name, arguments).await?;
                Ok(serde_json::json!({ "content": result }))
            }
            mcp_methods::PROMPTS_LIST => {
                Ok(serde_json::json!({ "prompts": self.prompts.list().await }))
            }
            mcp_methods::PROMPTS_GET => {
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CoreError::InvalidParams("prompt name is required".into()))?;
                let arguments: HashMap<String, String> = params
                    .get("arguments")
                    .map(|v| serde_json::from_value(v.clone()))
                    .transpose()?
                    .unwrap_or_default();
                let messages = self.prompts.get(name, arguments).await?;
                Ok(serde_json::json!({ "messages": messages }))
            }
            mcp_methods::RESOURCES_LIST => {
                Ok(serde_json::json!({ "resources": self.resources.list().await }))
            }
            mcp_methods::RESOURCES_GET => {
                let uri = params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CoreError::InvalidParams("resource uri is required".into()))?;
                let contents = self.resources.get(uri).await?;
                Ok(serde_json::json!({ "contents": contents }))
            }
            mcp_methods::SAMPLING_CREATE => match self.sampler {
                Some(ref sampler) => sampler.create_message(params).await,
                None => Err(CoreError::Unsupported(
                    "no sampling backend is configured".into(),
                )),
            },
            other => Err(CoreError::Unsupported(format!("unknown method: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_mesh::Part;
    use pretty_assertions::assert_eq;

    async fn surface_with_tool() -> McpSurface {
        let surface = McpSurface::new();
        surface
            .tools
            .register(
                Tool {
                    name: "upper".into(),
                    description: Some("Uppercases text".into()),
                    input_schema: serde_json::json!({"type": "object"}),
                },
                |args: Value| async move {
                    let text = args.get("text").and_then(Value::as_str).unwrap_or("");
                    Ok(Value::String(text.to_uppercase()))
                },
            )
            .await;
        surface
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let surface = surface_with_tool().await;

        let listed = surface
            .dispatch(mcp_methods::TOOLS_LIST, Value::Null)
            .await
            .unwrap();
        assert_eq!(listed["tools"][0]["name"], "upper");

        let result = surface
            .dispatch(
                mcp_methods::TOOLS_CALL,
                serde_json::json!({"name": "upper", "arguments": {"text": "hi"}}),
            )
            .await
            .unwrap();
        assert_eq!(result["content"], "HI");

        let err = surface
            .dispatch(
                mcp_methods::TOOLS_CALL,
                serde_json::json!({"name": "missing"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_prompts() {
        let surface = McpSurface::new();
        surface
            .prompts
            .register(
                Prompt {
                    name: "greet".into(),
                    description: None,
                    arguments: vec![PromptArgument {
                        name: "who".into(),
                        description: None,
                        required: true,
                    }],
                },
                |args| {
                    let who = args.get("who").cloned().unwrap_or_default();
                    Ok(vec![Message::user(vec![Part::text(format!("Hello {who}"))])])
                },
            )
            .await;

        let rendered = surface
            .dispatch(
                mcp_methods::PROMPTS_GET,
                serde_json::json!({"name": "greet", "arguments": {"who": "world"}}),
            )
            .await
            .unwrap();
        let text = rendered["messages"][0]["parts"][0]["text"].as_str().unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_resources() {
        let surface = McpSurface::new();
        surface
            .resources
            .register(
                Resource {
                    uri: "mesh://config".into(),
                    name: "config".into(),
                    description: None,
                    mime_type: Some("application/json".into()),
                },
                serde_json::json!({"region": "eu-1"}),
            )
            .await;

        let listed = surface
            .dispatch(mcp_methods::RESOURCES_LIST, Value::Null)
            .await
            .unwrap();
        assert_eq!(listed["resources"][0]["uri"], "mesh://config");

        let contents = surface
            .dispatch(
                mcp_methods::RESOURCES_GET,
                serde_json::json!({"uri": "mesh://config"}),
            )
            .await
            .unwrap();
        assert_eq!(contents["contents"]["region"], "eu-1");
    }

    #[tokio::test]
    async fn test_sampling_without_backend() {
        let surface = McpSurface::new();
        let err = surface
            .dispatch(mcp_methods::SAMPLING_CREATE, Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_delegate_tool_registered() {
        let surface = McpSurface::new();
        surface.register_delegate_tool().await;
        let tools = surface.tools.list().await;
        assert!(tools.iter().any(|t| t.name == "delegate"));
    }
}
