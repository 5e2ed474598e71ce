//! Provider trait definition.

use async_trait::async_trait;

use super::ProviderResult;
use crate::error::ProviderError;

/// Core trait for health check providers.
///
/// Builtins implement it directly; plugins are reached through an RPC
/// adapter that implements the same trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider name, which becomes the component name.
    fn name(&self) -> &str;

    /// Run the check against `hostname` and return a rendered report.
    async fn collect(&self, hostname: &str) -> Result<ProviderResult, ProviderError>;

    /// Run the check and return machine-readable JSON (optional).
    async fn collect_structured(
        &self,
        hostname: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let _ = hostname;
        Err(ProviderError::Unsupported(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly;

    #[async_trait]
    impl Provider for TextOnly {
        fn name(&self) -> &str {
            "textOnly"
        }

        async fn collect(&self, hostname: &str) -> Result<ProviderResult, ProviderError> {
            Ok(ProviderResult::text(format!("{} ok", hostname)))
        }
    }

    #[tokio::test]
    async fn test_collect() {
        let provider = TextOnly;
        let result = provider.collect("web-01").await.unwrap();
        assert_eq!(result.as_text(), Some("web-01 ok"));
    }

    #[tokio::test]
    async fn test_collect_structured_default_unsupported() {
        let provider = TextOnly;
        let err = provider.collect_structured("web-01").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(name) if name == "textOnly"));
    }
}
