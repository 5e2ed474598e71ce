//! Plugin wire protocol: handshake line and JSON-RPC 2.0 messages.

use serde::{Deserialize, Serialize};

/// Environment variable carrying the magic cookie.
pub const COOKIE_ENV: &str = "MONOKIT_PLUGIN_MAGIC_COOKIE";

/// Magic cookie value a plugin must echo back.
pub const MAGIC_COOKIE_VALUE: &str = "d4f0a9c2-monokit-health-plugin";

/// Environment variable carrying the protocol version.
pub const PROTOCOL_VERSION_ENV: &str = "MONOKIT_PLUGIN_PROTOCOL_VERSION";

/// Protocol version spoken by this host.
pub const PROTOCOL_VERSION: u32 = 1;

/// The only transport supported.
pub const STDIO_TRANSPORT: &str = "stdio";

/// First line a plugin writes to stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub magic_cookie_key: String,
    pub magic_cookie_value: String,
    pub protocol_version: u32,
    pub transport: String,
}

impl Handshake {
    /// The handshake a conforming plugin sends for `cookie`.
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            magic_cookie_key: COOKIE_ENV.to_string(),
            magic_cookie_value: cookie.into(),
            protocol_version: PROTOCOL_VERSION,
            transport: STDIO_TRANSPORT.to_string(),
        }
    }
}

/// JSON-RPC request. A request without `id` is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl RpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params: None,
        }
    }

    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response. `id` is null when the request could not be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn success(id: Option<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Request ID (can be string or number).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcErrorObject {
    pub const METHOD_NOT_FOUND: i32 = -32601;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    // Standard error codes
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request")
    }

    pub fn method_not_found() -> Self {
        Self::new(Self::METHOD_NOT_FOUND, "Method not found")
    }

    pub fn invalid_params() -> Self {
        Self::new(-32602, "Invalid params")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }
}

/// Plugin methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginMethod {
    Name,
    Collect,
    CollectStructured,
    Shutdown,
}

impl PluginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginMethod::Name => "name",
            PluginMethod::Collect => "collect",
            PluginMethod::CollectStructured => "collect_structured",
            PluginMethod::Shutdown => "shutdown",
        }
    }

    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "name" => Some(PluginMethod::Name),
            "collect" => Some(PluginMethod::Collect),
            "collect_structured" => Some(PluginMethod::CollectStructured),
            "shutdown" => Some(PluginMethod::Shutdown),
            _ => None,
        }
    }
}

/// Parameters of `collect` and `collect_structured`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectParams {
    pub hostname: String,
}

/// Result of `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameResult {
    pub name: String,
}

/// Result of `collect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectResult {
    pub output: String,
}

/// Result of `collect_structured`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResult {
    pub data: serde_json::Value,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
