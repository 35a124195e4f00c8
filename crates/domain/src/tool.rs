//! Tool metadata returned by `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named remote operation exposed by a tool server.
///
/// Produced by the server and consumed read-only by the client; `name` is
/// unique within one server's tool set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}
