//! Server connection configuration.
//!
//! Field names follow the camelCase wire shape of the user-facing config
//! file (`timeoutMs`), so the config layer can parse server entries
//! directly into these types. A `ServerConfig` is immutable for the
//! lifetime of the client built from it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How to reach one named tool server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Transport kind (`"stdio"` or `"http"`).
    #[serde(default)]
    pub transport: TransportKind,

    /// Command to spawn (stdio transport).
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments passed to the spawned command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory override for the spawned process.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Environment overlaid on the parent environment.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Endpoint URL (http transport).
    #[serde(default)]
    pub url: Option<String>,

    /// Extra headers attached verbatim to every http request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-request timeout override in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Transport kind for connecting to a tool server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}
