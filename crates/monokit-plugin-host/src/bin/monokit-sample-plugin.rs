//! Sample Monokit plugin.
//!
//! Reports basic facts about the host it runs on. Behavior can be adjusted
//! through environment variables, which the integration tests use to
//! simulate misbehaving plugins:
//!
//! - `MONOKIT_SAMPLE_NAME`: component name (default `sampleHealth`)
//! - `MONOKIT_SAMPLE_MODE`: `ok` (default), `hang`, `fail`, `crash`, `text-only`

use std::time::Duration;

use async_trait::async_trait;
use monokit_protocols::{Provider, ProviderError, ProviderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ok,
    Hang,
    Fail,
    Crash,
    TextOnly,
}

impl Mode {
    fn from_env() -> Self {
        match std::env::var("MONOKIT_SAMPLE_MODE").as_deref() {
            Ok("hang") => Mode::Hang,
            Ok("fail") => Mode::Fail,
            Ok("crash") => Mode::Crash,
            Ok("text-only") => Mode::TextOnly,
            _ => Mode::Ok,
        }
    }
}

struct SampleProvider {
    name: String,
    mode: Mode,
}

impl SampleProvider {
    async fn misbehave(&self) -> Result<(), ProviderError> {
        match self.mode {
            Mode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Mode::Fail => Err(ProviderError::CallFailed("sample check failed".to_string())),
            Mode::Crash => std::process::exit(3),
            Mode::Ok | Mode::TextOnly => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for SampleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, hostname: &str) -> Result<ProviderResult, ProviderError> {
        self.misbehave().await?;
        Ok(ProviderResult::text(format!(
            "{}: OK on {} (pid {})",
            self.name,
            hostname,
            std::process::id()
        )))
    }

    async fn collect_structured(&self, hostname: &str) -> Result<serde_json::Value, ProviderError> {
        if self.mode == Mode::TextOnly {
            return Err(ProviderError::Unsupported(self.name.clone()));
        }
        self.misbehave().await?;
        Ok(serde_json::json!({
            "name": self.name,
            "hostname": hostname,
            "pid": std::process::id(),
            "healthy": true,
        }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let provider = SampleProvider {
        name: std::env::var("MONOKIT_SAMPLE_NAME").unwrap_or_else(|_| "sampleHealth".to_string()),
        mode: Mode::from_env(),
    };

    if let Err(e) = monokit_plugin_host::serve(&provider).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
