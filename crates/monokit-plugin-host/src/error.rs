//! Plugin host errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use monokit_protocols::ProviderError;

use crate::protocol::RpcErrorObject;
use crate::transport::TransportError;

/// Failure to load or supervise a plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin is not an executable file: {}", .0.display())]
    NotExecutable(PathBuf),

    #[error("Failed to spawn plugin {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Malformed plugin handshake: {0}")]
    HandshakeMalformed(String),

    #[error("Plugin presented an invalid magic cookie")]
    CookieMismatch,

    #[error("Plugin protocol version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Plugin directory {} is unreadable: {source}", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin RPC failed: {0}")]
    Rpc(#[from] RpcError),
}

/// Failure of a single RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Plugin error ({code}): {message}")]
    Server { code: i32, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Call cancelled")]
    Cancelled,
}

impl From<RpcErrorObject> for RpcError {
    fn from(err: RpcErrorObject) -> Self {
        RpcError::Server {
            code: err.code,
            message: err.message,
        }
    }
}

impl RpcError {
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, RpcError::Server { code, .. } if *code == RpcErrorObject::METHOD_NOT_FOUND)
    }

    /// Map to a provider error for the plugin named `plugin`.
    pub fn into_provider_error(self, plugin: &str) -> ProviderError {
        match self {
            err if err.is_method_not_found() => ProviderError::Unsupported(plugin.to_string()),
            RpcError::Server { message, .. } => ProviderError::CallFailed(message),
            RpcError::Protocol(message) => ProviderError::Malformed(message),
            RpcError::Timeout(after) => ProviderError::Timeout(after),
            RpcError::Cancelled => ProviderError::Cancelled,
            RpcError::Transport(err) => ProviderError::Transport(err.to_string()),
        }
    }
}

/// Failure inside a plugin process serving the host.
#[derive(Debug, Error)]
pub enum GuestError {
    #[error("This binary is a Monokit plugin and must be launched by the Monokit host")]
    NotLaunchedByHost,

    #[error("Host speaks plugin protocol {offered:?}, this plugin supports {supported}")]
    UnsupportedProtocol { offered: String, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
