//! Wire-level protocol bindings.
//!
//! - [`jsonrpc`] — JSON-RPC 2.0 envelopes, method names, and error codes.
//! - [`sse`] — Server-Sent Events streaming for task updates.

pub mod jsonrpc;
pub mod sse;
