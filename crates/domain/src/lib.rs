//! `tw-domain` — shared types for ToolWire.
//!
//! The canonical definitions for server configuration and tool metadata
//! live here so that the outer layers (config discovery, tool-list caching,
//! the CLI) can deserialize them without depending on the protocol engine
//! in `tw-mcp-client`.

pub mod config;
pub mod error;
pub mod tool;

// Re-exports for ergonomic imports.
pub use config::{ServerConfig, TransportKind};
pub use tool::ToolDefinition;
