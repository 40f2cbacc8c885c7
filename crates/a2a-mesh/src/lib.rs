//! # a2a-mesh
//!
//! Data model, JSON-RPC 2.0 transport, and client for the Agent-to-Agent
//! (A2A) task protocol.
//!
//! A2A lets independent agent services discover each other, delegate tasks,
//! and stream progress, regardless of how each agent is implemented. This
//! crate holds the protocol layers shared by servers and clients:
//!
//! 1. **Canonical data model** — [`Task`], [`Message`], [`Part`],
//!    [`Artifact`], [`AgentCard`], push notification configs.
//! 2. **Wire binding** — JSON-RPC 2.0 envelopes and SSE streaming frames.
//! 3. **Client** — [`A2AClient`], the delegation seam used by one agent to
//!    act as a client of another.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a2a_mesh::{A2AClient, AgentCard, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Discover a remote agent
//!     let card = AgentCard::discover("https://agent.example.com").await?;
//!     println!("Found: {}", card.name);
//!
//!     // Delegate a task to it
//!     let client = A2AClient::new("https://agent.example.com")?;
//!     let task = client.delegate(Message::user_text("Summarize Q4 report"), None).await?;
//!     println!("Task state: {}", task.status.state);
//!     Ok(())
//! }
//! ```

pub mod agent_card;
pub mod artifact;
pub mod client;
pub mod error;
pub mod event;
pub mod message;
pub mod notification;
pub mod params;
pub mod task;
pub mod transport;

// Re-export primary types
pub use agent_card::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill};
pub use artifact::Artifact;
pub use client::A2AClient;
pub use error::{MeshError, MeshResult};
pub use event::{TaskArtifactUpdateEvent, TaskStatusUpdateEvent, TaskUpdate};
pub use message::{FileContent, FormPayload, Message, Part, Role};
pub use notification::{AuthenticationInfo, PushNotificationConfig};
pub use params::{TaskIdParams, TaskPushConfigParams, TaskQueryParams, TaskSendParams};
pub use task::{Task, TaskState, TaskStatus};
pub use transport::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use transport::sse::TaskUpdateStream;
