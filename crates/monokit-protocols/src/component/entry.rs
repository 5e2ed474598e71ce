//! Entry points invoked by the scheduler and the CLI.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ComponentError;
use crate::provider::{Provider, ProviderResult};

/// Context passed to every entry point invocation.
#[derive(Debug, Clone)]
pub struct InvokeContext {
    /// Host name the check reports for.
    pub hostname: String,
    /// Request machine-readable output instead of a text report.
    pub structured: bool,
}

impl InvokeContext {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            structured: false,
        }
    }

    pub fn with_structured(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }
}

/// The invocable action behind a component.
#[async_trait]
pub trait EntryPoint: Send + Sync {
    async fn invoke(&self, ctx: &InvokeContext) -> Result<(), ComponentError>;
}

/// Entry point that runs a [`Provider`] and prints its report.
pub struct ProviderEntryPoint {
    provider: Arc<dyn Provider>,
}

impl ProviderEntryPoint {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Collect a result without printing it.
    pub async fn collect(&self, ctx: &InvokeContext) -> Result<ProviderResult, ComponentError> {
        if ctx.structured {
            let value = self.provider.collect_structured(&ctx.hostname).await?;
            Ok(ProviderResult::Structured(value))
        } else {
            Ok(self.provider.collect(&ctx.hostname).await?)
        }
    }
}

#[async_trait]
impl EntryPoint for ProviderEntryPoint {
    async fn invoke(&self, ctx: &InvokeContext) -> Result<(), ComponentError> {
        let result = self.collect(ctx).await?;
        println!("{}", result.render());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    struct StaticProvider;

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn collect(&self, hostname: &str) -> Result<ProviderResult, ProviderError> {
            Ok(ProviderResult::text(format!("{}: fine", hostname)))
        }

        async fn collect_structured(
            &self,
            hostname: &str,
        ) -> Result<serde_json::Value, ProviderError> {
            Ok(serde_json::json!({ "host": hostname, "healthy": true }))
        }
    }

    #[tokio::test]
    async fn test_collect_text() {
        let entry = ProviderEntryPoint::new(Arc::new(StaticProvider));
        let result = entry.collect(&InvokeContext::new("db-01")).await.unwrap();
        assert_eq!(result.as_text(), Some("db-01: fine"));
    }

    #[tokio::test]
    async fn test_collect_structured() {
        let entry = ProviderEntryPoint::new(Arc::new(StaticProvider));
        let ctx = InvokeContext::new("db-01").with_structured(true);
        let result = entry.collect(&ctx).await.unwrap();
        assert_eq!(result.as_structured().unwrap()["healthy"], true);
    }

    #[tokio::test]
    async fn test_invoke_ok() {
        let entry = ProviderEntryPoint::new(Arc::new(StaticProvider));
        assert!(entry.invoke(&InvokeContext::new("db-01")).await.is_ok());
    }
}
