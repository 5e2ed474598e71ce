//! Plugin side of the protocol.
//!
//! A plugin binary implements [`Provider`] and hands it to [`serve`]:
//!
//! ```no_run
//! # use monokit_protocols::Provider;
//! # async fn run(provider: impl Provider) -> Result<(), monokit_plugin_host::GuestError> {
//! monokit_plugin_host::serve(&provider).await
//! # }
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use monokit_protocols::{Provider, ProviderError};

use crate::error::GuestError;
use crate::protocol::{
    COOKIE_ENV, CollectParams, CollectResult, Handshake, NameResult, PROTOCOL_VERSION,
    PROTOCOL_VERSION_ENV, PluginMethod, RpcErrorObject, RpcRequest, RpcResponse,
    StructuredResult,
};

/// Serve `provider` on stdin/stdout until the host sends `shutdown` or
/// closes stdin.
///
/// Refuses to run when the magic cookie is absent, so launching a plugin by
/// hand fails loudly instead of hanging on stdin.
pub async fn serve<P: Provider + ?Sized>(provider: &P) -> Result<(), GuestError> {
    let handshake = handshake_from(
        std::env::var(COOKIE_ENV).ok(),
        std::env::var(PROTOCOL_VERSION_ENV).ok(),
    )?;

    let mut stdout = tokio::io::stdout();
    write_line(&mut stdout, &serde_json::to_string(&handshake)?).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    serve_io(provider, stdin, stdout).await
}

/// Handshake answering the cookie and protocol version the host exported.
///
/// The cookie is echoed as given. A host that does not export a version is
/// assumed to speak ours.
fn handshake_from(
    cookie: Option<String>,
    version: Option<String>,
) -> Result<Handshake, GuestError> {
    let cookie = cookie
        .filter(|c| !c.is_empty())
        .ok_or(GuestError::NotLaunchedByHost)?;

    if let Some(offered) = version {
        if offered.trim().parse::<u32>().ok() != Some(PROTOCOL_VERSION) {
            return Err(GuestError::UnsupportedProtocol {
                offered,
                supported: PROTOCOL_VERSION,
            });
        }
    }
    Ok(Handshake::new(cookie))
}

/// Answer requests read from `reader` on `writer`.
pub async fn serve_io<P, R, W>(provider: &P, mut reader: R, mut writer: W) -> Result<(), GuestError>
where
    P: Provider + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            debug!("Host closed stdin");
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let request: RpcRequest = match serde_json::from_str(line.trim()) {
            Ok(request) => request,
            Err(_) => {
                let response = RpcResponse::error(None, RpcErrorObject::parse_error());
                write_line(&mut writer, &serde_json::to_string(&response)?).await?;
                continue;
            }
        };

        let method = PluginMethod::parse(&request.method);
        if method == Some(PluginMethod::Shutdown) {
            debug!("Shutdown requested by host");
            return Ok(());
        }
        if request.is_notification() {
            continue;
        }

        let id = request.id.clone();
        let response = match dispatch(provider, method, request.params).await {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::error(id, error),
        };
        write_line(&mut writer, &serde_json::to_string(&response)?).await?;
    }
}

async fn dispatch<P: Provider + ?Sized>(
    provider: &P,
    method: Option<PluginMethod>,
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, RpcErrorObject> {
    let encode = |value: Result<serde_json::Value, serde_json::Error>| {
        value.map_err(|e| RpcErrorObject::internal_error(e.to_string()))
    };

    match method {
        Some(PluginMethod::Name) => encode(serde_json::to_value(NameResult {
            name: provider.name().to_string(),
        })),
        Some(PluginMethod::Collect) => {
            let params = collect_params(params)?;
            let output = provider
                .collect(&params.hostname)
                .await
                .map_err(provider_error)?
                .render();
            encode(serde_json::to_value(CollectResult { output }))
        }
        Some(PluginMethod::CollectStructured) => {
            let params = collect_params(params)?;
            let data = provider
                .collect_structured(&params.hostname)
                .await
                .map_err(provider_error)?;
            encode(serde_json::to_value(StructuredResult { data }))
        }
        Some(PluginMethod::Shutdown) | None => Err(RpcErrorObject::method_not_found()),
    }
}

fn collect_params(params: Option<serde_json::Value>) -> Result<CollectParams, RpcErrorObject> {
    params
        .and_then(|p| serde_json::from_value(p).ok())
        .ok_or_else(RpcErrorObject::invalid_params)
}

fn provider_error(err: ProviderError) -> RpcErrorObject {
    match err {
        ProviderError::Unsupported(_) => RpcErrorObject::method_not_found(),
        other => RpcErrorObject::internal_error(other.to_string()),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), GuestError> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
