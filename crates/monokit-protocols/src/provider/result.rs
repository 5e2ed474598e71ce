//! Provider result payload.

use serde::{Deserialize, Serialize};

/// Opaque per-call payload returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum ProviderResult {
    /// A rendered, human-readable report.
    Text(String),
    /// A structured JSON document.
    Structured(serde_json::Value),
}

impl ProviderResult {
    pub fn text(text: impl Into<String>) -> Self {
        ProviderResult::Text(text.into())
    }

    pub fn structured(value: serde_json::Value) -> Self {
        ProviderResult::Structured(value)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProviderResult::Text(text) => Some(text),
            ProviderResult::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            ProviderResult::Structured(value) => Some(value),
            ProviderResult::Text(_) => None,
        }
    }

    /// Render the payload for terminal output.
    pub fn render(&self) -> String {
        match self {
            ProviderResult::Text(text) => text.clone(),
            ProviderResult::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}
