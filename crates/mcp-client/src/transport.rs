//! Transport layer.
//!
//! Both transports satisfy the same contract — send one request, await the
//! response carrying its id, close — so the client facade is
//! transport-agnostic:
//! - **Stdio**: spawn a child process and multiplex concurrent requests
//!   over its stdin/stdout with `Content-Length` framing.
//! - **Http**: one POST per call, no persistent connection.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use tw_domain::config::ServerConfig;

use crate::codec::FrameCodec;
use crate::pending::PendingRequests;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Default per-request timeout when the server config gives no override.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Bounded wait for a child process to exit during shutdown.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Trait for tool-server transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one JSON-RPC request and wait for the response that carries
    /// its id.
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Release the underlying process or connection. Must not hang, and
    /// must not leave any in-flight caller suspended.
    async fn close(&self);
}

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid server config: {0}")]
    Config(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timed out waiting for response")]
    Timeout,

    #[error("transport closed before a response arrived")]
    Closed,

    #[error("no response from server")]
    NoResponse,
}

fn request_timeout(config: &ServerConfig) -> Duration {
    Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stdio transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Stdio transport: spawns a child process and exchanges
/// `Content-Length`-framed JSON-RPC over its stdin/stdout.
///
/// Any number of requests may be outstanding at once; a background reader
/// task decodes frames off stdout and routes each response to its caller
/// through the pending-request table, whatever order responses arrive in.
pub struct StdioTransport {
    stdin: Mutex<Option<ChildStdin>>,
    child: Mutex<Child>,
    pending: Arc<PendingRequests>,
    timeout: Duration,
}

impl StdioTransport {
    /// Spawn the configured command and start the stdout reader task.
    ///
    /// The child inherits our environment overlaid with the configured
    /// overrides; its stderr passes straight through to our own (it is
    /// diagnostic output, not protocol data).
    pub fn spawn(config: &ServerConfig) -> Result<Self, TransportError> {
        let command = config
            .command
            .as_deref()
            .ok_or_else(|| TransportError::Config("stdio server missing command".into()))?;

        let mut cmd = tokio::process::Command::new(command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;

        let pending = Arc::new(PendingRequests::new());
        tokio::spawn(read_responses(stdout, Arc::clone(&pending)));

        Ok(Self {
            stdin: Mutex::new(Some(stdin)),
            child: Mutex::new(child),
            pending,
            timeout: request_timeout(config),
        })
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut stdin = self.stdin.lock().await;
        let Some(stdin) = stdin.as_mut() else {
            return Err(TransportError::Closed);
        };
        stdin.write_all(frame).await?;
        stdin.flush().await?;
        Ok(())
    }
}

fn missing_pipe(name: &str) -> TransportError {
    TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("failed to capture child {name}"),
    ))
}

/// Reader task: feed child stdout through the framing codec and hand each
/// decoded response to the pending table.
///
/// Whatever ends the stream — EOF because the process exited, a read
/// error, or a fatal framing error — every pending caller is failed so
/// nobody waits on a dead transport.
async fn read_responses(mut stdout: ChildStdout, pending: Arc<PendingRequests>) {
    let mut codec = FrameCodec::new();
    let mut chunk = [0u8; 8192];

    'stream: loop {
        let n = match stdout.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "error reading server stdout");
                break;
            }
        };
        codec.extend(&chunk[..n]);

        loop {
            match codec.next() {
                Ok(Some(payload)) => {
                    match serde_json::from_value::<JsonRpcResponse>(payload) {
                        Ok(response) => {
                            let id = response.id;
                            pending.complete(id, response);
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping message that is not a response envelope");
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "framing error, abandoning server stdout");
                    break 'stream;
                }
            }
        }
    }

    pending.abort_all();
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let id = request.id;
        let frame = FrameCodec::encode(&serde_json::to_value(&request)?)?;

        // Register before writing so a response cannot arrive faster than
        // the table entry exists.
        let rx = self.pending.register(id);

        tracing::debug!(id, method = %request.method, "sending request");
        if let Err(e) = self.write_frame(&frame).await {
            self.pending.forget(id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            // Sender dropped: the reader task aborted the table.
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                // A response landing after this point is dropped by the table.
                self.pending.forget(id);
                Err(TransportError::Timeout)
            }
        }
    }

    async fn close(&self) {
        // Closing stdin is the graceful exit signal for a stdio server.
        if let Some(mut stdin) = self.stdin.lock().await.take() {
            if let Err(e) = stdin.shutdown().await {
                tracing::debug!(error = %e, "error closing server stdin");
            }
        }

        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_WAIT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(?status, "server process exited");
            }
            Ok(Err(e)) => {
                // Already reaped or otherwise gone; nothing left to release.
                tracing::debug!(error = %e, "error waiting for server process");
            }
            Err(_) => {
                tracing::warn!("server process did not exit within timeout, killing");
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "failed to kill server process");
                }
            }
        }

        self.pending.abort_all();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HTTP transport: each request is one POST whose body is the JSON-RPC
/// envelope and whose response body must be one response envelope.
///
/// There is no multiplexing to manage; a degenerate single-entry reply
/// table keyed by the id the server echoed catches mismatched or missing
/// ids.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
    replies: parking_lot::Mutex<HashMap<u64, JsonRpcResponse>>,
}

impl HttpTransport {
    /// Build a client for the configured URL, validating headers up front.
    pub fn new(config: &ServerConfig) -> Result<Self, TransportError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| TransportError::Config("http server missing url".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Config(format!("invalid value for header {name:?}: {e}")))?;
            headers.insert(header, value);
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout(config))
            .build()?;

        Ok(Self {
            http,
            url,
            headers,
            replies: parking_lot::Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let id = request.id;
        tracing::debug!(id, method = %request.method, url = %self.url, "sending request");

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        // Stored under the id the server echoed; a mismatch leaves our
        // slot empty and surfaces as NoResponse.
        let mut replies = self.replies.lock();
        let echoed = response.id;
        replies.insert(echoed, response);
        match replies.remove(&id) {
            Some(reply) => Ok(reply),
            None => {
                // No caller will ever claim the stray entry.
                replies.remove(&echoed);
                Err(TransportError::NoResponse)
            }
        }
    }

    async fn close(&self) {
        // Nothing persistent to release.
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
