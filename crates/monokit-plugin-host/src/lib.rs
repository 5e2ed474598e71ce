//! Out-of-process health check plugins.
//!
//! A plugin is an executable that speaks a short handshake followed by
//! newline-delimited JSON-RPC 2.0 on its stdin/stdout. The [`PluginHost`]
//! discovers plugin binaries in a directory, launches and validates each one,
//! wraps it as a [`Provider`](monokit_protocols::Provider) and registers the
//! resulting component through
//! [`ComponentRegistryAccess`](monokit_protocols::ComponentRegistryAccess).
//!
//! Plugin authors implement `Provider` and call [`serve`] from `main`.

mod client;
mod error;
mod guest;
mod host;
mod protocol;
mod provider;
mod transport;

pub use client::PluginClient;
pub use error::{GuestError, PluginError, RpcError};
pub use guest::{serve, serve_io};
pub use host::{DiscoveryReport, PluginHost, PluginHostConfig};
pub use protocol::{
    COOKIE_ENV, Handshake, MAGIC_COOKIE_VALUE, PROTOCOL_VERSION, PROTOCOL_VERSION_ENV,
    PluginMethod, RequestId, RpcErrorObject, RpcRequest, RpcResponse,
};
pub use provider::PluginProvider;
pub use transport::{StdioTransport, Transport, TransportError};
