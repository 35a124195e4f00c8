//! `tw-mcp-client` — dual-transport JSON-RPC client for MCP tool servers.
//!
//! This crate provides:
//! - JSON-RPC 2.0 envelope types and monotonic request-id allocation.
//! - A `Content-Length` framing codec for the stdio wire format.
//! - A pending-request table that correlates out-of-order responses to
//!   their callers, with a per-request timeout.
//! - A stdio transport that spawns a child process and multiplexes
//!   concurrent requests over its stdin/stdout.
//! - An HTTP transport satisfying the same contract with one POST per call.
//! - [`McpClient`], the transport-agnostic facade exposing `tools/list`
//!   and `tools/call`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tw_domain::ServerConfig;
//! use tw_mcp_client::McpClient;
//!
//! let config: ServerConfig = /* from the servers section of the config */;
//! let client = McpClient::connect(&config)?;
//!
//! for tool in client.list_tools().await?.tools {
//!     println!("{}", tool.name);
//! }
//!
//! let result = client.call_tool("read_file", json!({"path": "/tmp/test.txt"})).await?;
//! client.close().await;
//! ```

pub mod client;
pub mod codec;
pub mod pending;
pub mod protocol;
pub mod transport;

// Re-exports for convenience.
pub use client::{ClientError, McpClient};
pub use codec::{FrameCodec, FramingError};
pub use pending::PendingRequests;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestIds, ToolsListResult};
pub use transport::{HttpTransport, StdioTransport, Transport, TransportError};
