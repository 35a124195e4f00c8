//! Client facade: transport-agnostic `tools/list` and `tools/call`.

use serde_json::{json, Value};

use tw_domain::config::{ServerConfig, TransportKind};

use crate::protocol::{JsonRpcError, JsonRpcRequest, RequestIds, ToolsListResult};
use crate::transport::{HttpTransport, StdioTransport, Transport, TransportError};

/// Errors surfaced by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a JSON-RPC error object.
    #[error("{0}")]
    Remote(JsonRpcError),

    /// The server answered, but the result had an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<ClientError> for tw_domain::error::Error {
    fn from(e: ClientError) -> Self {
        use tw_domain::error::Error;
        match e {
            ClientError::Transport(TransportError::Config(msg)) => Error::Config(msg),
            ClientError::Transport(TransportError::Io(io)) => Error::Io(io),
            ClientError::Transport(TransportError::Json(json)) => Error::Json(json),
            ClientError::Transport(TransportError::Http(http)) => Error::Http(http.to_string()),
            ClientError::Transport(timeout @ TransportError::Timeout) => {
                Error::Timeout(timeout.to_string())
            }
            other => Error::Other(other.to_string()),
        }
    }
}

/// A connection to one tool server, over whichever transport its config
/// declares.
///
/// The request-id counter is the only state shared between operations;
/// everything transport-specific lives behind the [`Transport`] contract.
pub struct McpClient {
    transport: Box<dyn Transport>,
    ids: RequestIds,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient").finish_non_exhaustive()
    }
}

impl McpClient {
    /// Select and construct the transport for the given server config.
    ///
    /// Configuration errors (stdio without a command, http without a url)
    /// fail here, before any protocol I/O.
    pub fn connect(config: &ServerConfig) -> Result<Self, ClientError> {
        let transport: Box<dyn Transport> = match config.transport {
            TransportKind::Stdio => Box::new(StdioTransport::spawn(config)?),
            TransportKind::Http => Box::new(HttpTransport::new(config)?),
        };
        Ok(Self {
            transport,
            ids: RequestIds::new(),
        })
    }

    /// Allocate an id, send the request, and interpret the response.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let request = JsonRpcRequest::new(self.ids.next(), method, params);
        let response = self.transport.request(request).await?;
        response.into_result().map_err(ClientError::Remote)
    }

    /// List the tools the server exposes (`tools/list`).
    pub async fn list_tools(&self) -> Result<ToolsListResult, ClientError> {
        let result = self.request("tools/list", json!({})).await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::Protocol(format!("failed to parse tools/list result: {e}")))
    }

    /// Invoke one tool by name (`tools/call`) and return its raw result.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        self.request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    /// Close the underlying transport. For stdio servers this terminates
    /// the child process; for http it is a no-op.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    #[cfg(test)]
    fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            ids: RequestIds::new(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
