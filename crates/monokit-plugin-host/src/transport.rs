//! Stdio transport to a plugin subprocess.

use std::process::ExitStatus;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::protocol::{RpcRequest, RpcResponse};

/// Transport trait for plugin communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and receive its response.
    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, TransportError>;

    /// Send a notification; no response is read.
    async fn notify(&self, request: RpcRequest) -> Result<(), TransportError>;

    /// Close the transport.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Connection closed")]
    Closed,
}

/// Newline-delimited JSON over a child's stdin/stdout.
pub struct StdioTransport {
    pid: Option<u32>,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Mutex<Option<BufReader<ChildStdout>>>,
}

impl StdioTransport {
    /// Take ownership of a child spawned with piped stdin and stdout.
    pub fn new(mut child: Child) -> Result<Self, TransportError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Process("Failed to capture stdin".to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Process("Failed to capture stdout".to_string()))?;

        Ok(Self {
            pid: child.id(),
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(Some(stdin)),
            stdout: Mutex::new(Some(BufReader::new(stdout))),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Read one raw line from stdout, without the trailing newline.
    pub async fn read_line(&self) -> Result<String, TransportError> {
        let mut stdout_guard = self.stdout.lock().await;
        let stdout = stdout_guard.as_mut().ok_or(TransportError::Closed)?;

        let mut line = String::new();
        if stdout.read_line(&mut line).await? == 0 {
            return Err(TransportError::Closed);
        }
        Ok(line.trim_end().to_string())
    }

    async fn write_message(&self, request: &RpcRequest) -> Result<(), TransportError> {
        let mut stdin_guard = self.stdin.lock().await;
        let stdin = stdin_guard.as_mut().ok_or(TransportError::Closed)?;

        let json = serde_json::to_string(request)?;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Stop the child: close stdin, wait up to `grace`, then kill.
    pub async fn shutdown(&self, grace: Duration) -> Result<Option<ExitStatus>, TransportError> {
        *self.stdin.lock().await = None;

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(None);
        };

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => Ok(Some(status?)),
            Err(_) => {
                warn!("Plugin pid {:?} did not exit within {:?}, killing", self.pid, grace);
                child.kill().await?;
                Ok(child.try_wait()?)
            }
        }
    }

    /// Kill the child immediately.
    pub async fn kill(&self) -> Result<(), TransportError> {
        *self.stdin.lock().await = None;
        if let Some(mut child) = self.child.lock().await.take() {
            child.kill().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, TransportError> {
        // Hold stdout across the write so responses cannot interleave.
        let mut stdout_guard = self.stdout.lock().await;
        let stdout = stdout_guard.as_mut().ok_or(TransportError::Closed)?;

        self.write_message(&request).await?;

        loop {
            let mut line = String::new();
            if stdout.read_line(&mut line).await? == 0 {
                return Err(TransportError::Closed);
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response: RpcResponse = match serde_json::from_str(line) {
                Ok(response) => response,
                Err(e) => {
                    // Stray prints and torn lines do not end the call.
                    debug!("Skipping unparseable plugin output {:?}: {}", line, e);
                    continue;
                }
            };
            if response.id == request.id {
                return Ok(response);
            }
            // Late reply to a request that timed out earlier.
            debug!("Discarding stale plugin response {:?}", response.id);
        }
    }

    async fn notify(&self, request: RpcRequest) -> Result<(), TransportError> {
        self.write_message(&request).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.kill().await?;
        *self.stdout.lock().await = None;
        Ok(())
    }
}
