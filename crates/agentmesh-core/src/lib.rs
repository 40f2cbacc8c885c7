//! # agentmesh-core
//!
//! Server core for AgentMesh — hosts the A2A task protocol: the task
//! lifecycle engine, SSE streaming, signed push notifications, the agent
//! catalog, and the MCP tool/resource side-channel.
//!
//! ## Architecture
//!
//! Control flow per request:
//!
//! ```text
//! Auth Gate → JSON-RPC Router → Task Manager
//!            → (Task Store | SSE Broker | Push Sender | Delegation) → response
//! ```
//!
//! - [`store::TaskStore`] — authoritative in-memory task registry
//! - [`broker::EventBroker`] — per-task event fan-out with bounded queues
//! - [`manager::TaskManager`] — lifecycle orchestration and the executor seam
//! - [`push::PushSender`] — RS256-signed webhook delivery with JWKS
//! - [`catalog::Catalog`] — agent discovery registry with heartbeat expiry
//! - [`auth`] — pluggable request authentication
//! - [`mcp::McpSurface`] — tools / prompts / resources / sampling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentmesh_core::prelude::*;
//! use a2a_mesh::{AgentCard, AgentCapabilities};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let key = Arc::new(SigningKey::generate()?);
//!     let push = Arc::new(PushSender::new(key, config.public_url.clone(), (&config.push).into()));
//!     let manager = Arc::new(TaskManager::new(
//!         Arc::new(TaskStore::new()),
//!         Arc::new(EventBroker::new()),
//!         push,
//!         Arc::new(EchoExecutor),
//!     ));
//!     let card = AgentCard {
//!         name: "echo".into(),
//!         url: config.public_url.parse()?,
//!         version: "1.0.0".into(),
//!         description: None,
//!         provider: None,
//!         capabilities: AgentCapabilities { streaming: true, push_notifications: true, state_transition_history: true },
//!         authentication: None,
//!         default_input_modes: vec!["text".into()],
//!         default_output_modes: vec!["text".into()],
//!         skills: vec![],
//!     };
//!     let state = AppState::new(manager, Arc::new(McpSurface::new()), Arc::new(NoAuth), card);
//!     serve(&config, state).await
//! }
//! ```

pub mod auth;
pub mod broker;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod mcp;
pub mod push;
pub mod server;
pub mod store;
pub mod telemetry;

/// The names most service binaries need.
pub mod prelude {
    pub use crate::auth::{ApiKeyAuth, Authenticator, BearerAuth, NoAuth};
    pub use crate::broker::EventBroker;
    pub use crate::catalog::{Catalog, CatalogClient};
    pub use crate::config::ServerConfig;
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::executor::{
        EchoExecutor, EventSink, ExecutionContext, ExecutorError, FormExecutor, TaskExecutor,
    };
    pub use crate::manager::TaskManager;
    pub use crate::mcp::McpSurface;
    pub use crate::push::{PushSender, SigningKey};
    pub use crate::server::{router, serve, AppState};
    pub use crate::store::TaskStore;
}

pub use error::{CoreError, CoreResult};
