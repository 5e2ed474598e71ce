//! Plugin RPC client.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::RpcError;
use crate::protocol::{
    CollectParams, CollectResult, NameResult, PluginMethod, RpcRequest, StructuredResult,
};
use crate::transport::Transport;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Client for the plugin JSON-RPC methods.
///
/// Every call is bounded by `call_timeout` and aborted when `cancel` fires.
pub struct PluginClient {
    transport: Arc<dyn Transport>,
    request_id: AtomicI64,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl PluginClient {
    /// Create a new plugin client.
    pub fn new(
        transport: Arc<dyn Transport>,
        call_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            request_id: AtomicI64::new(1),
            call_timeout,
            cancel,
        }
    }

    /// Get the next request ID.
    fn next_id(&self) -> i64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and decode its result.
    async fn request<T: DeserializeOwned>(
        &self,
        method: PluginMethod,
        params: Option<serde_json::Value>,
    ) -> Result<T, RpcError> {
        let id = self.next_id();
        let mut request = RpcRequest::new(id, method.as_str());
        if let Some(p) = params {
            request = request.with_params(p);
        }

        debug!("Sending plugin request: {} (id={})", method.as_str(), id);

        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(RpcError::Cancelled),
            sent = tokio::time::timeout(self.call_timeout, self.transport.send(request)) => {
                sent.map_err(|_| RpcError::Timeout(self.call_timeout))??
            }
        };

        if let Some(err) = response.error {
            return Err(err.into());
        }

        let result = response.result.ok_or_else(|| {
            RpcError::Protocol(format!("{} response has no result", method.as_str()))
        })?;
        serde_json::from_value(result).map_err(|e| RpcError::Protocol(e.to_string()))
    }

    /// Ask the plugin for its component name.
    pub async fn name(&self) -> Result<String, RpcError> {
        let result: NameResult = self.request(PluginMethod::Name, None).await?;
        Ok(result.name)
    }

    /// Collect the text report.
    pub async fn collect(&self, hostname: &str) -> Result<String, RpcError> {
        let params = serde_json::to_value(CollectParams {
            hostname: hostname.to_string(),
        })
        .map_err(|e| RpcError::Protocol(e.to_string()))?;
        let result: CollectResult = self.request(PluginMethod::Collect, Some(params)).await?;
        Ok(result.output)
    }

    /// Collect the structured report.
    pub async fn collect_structured(&self, hostname: &str) -> Result<serde_json::Value, RpcError> {
        let params = serde_json::to_value(CollectParams {
            hostname: hostname.to_string(),
        })
        .map_err(|e| RpcError::Protocol(e.to_string()))?;
        let result: StructuredResult = self
            .request(PluginMethod::CollectStructured, Some(params))
            .await?;
        Ok(result.data)
    }

    /// Ask the plugin to exit. No response is expected.
    pub async fn shutdown(&self) -> Result<(), RpcError> {
        self.transport
            .notify(RpcRequest::notification(PluginMethod::Shutdown.as_str()))
            .await?;
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
