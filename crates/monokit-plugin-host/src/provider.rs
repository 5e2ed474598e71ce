//! Provider adapter over a plugin client.

use std::sync::Arc;

use async_trait::async_trait;

use monokit_protocols::{Provider, ProviderError, ProviderResult};

use crate::client::PluginClient;

/// A [`Provider`] whose checks run in a plugin process.
pub struct PluginProvider {
    name: String,
    client: Arc<PluginClient>,
}

impl PluginProvider {
    pub fn new(name: impl Into<String>, client: Arc<PluginClient>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    pub fn client(&self) -> &Arc<PluginClient> {
        &self.client
    }
}

#[async_trait]
impl Provider for PluginProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, hostname: &str) -> Result<ProviderResult, ProviderError> {
        self.client
            .collect(hostname)
            .await
            .map(ProviderResult::Text)
            .map_err(|e| e.into_provider_error(&self.name))
    }

    async fn collect_structured(&self, hostname: &str) -> Result<serde_json::Value, ProviderError> {
        self.client
            .collect_structured(hostname)
            .await
            .map_err(|e| e.into_provider_error(&self.name))
    }
}
