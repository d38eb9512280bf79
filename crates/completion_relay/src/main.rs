use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use completion_relay::{router, ApiUpstream, AppState, UpstreamConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "completion-relay")]
struct Args {
    #[arg(long, env = "RELAY_ADDR", default_value = "127.0.0.1:8787")]
    addr: String,

    #[arg(
        long,
        env = "RELAY_UPSTREAM_URL",
        default_value = "https://api.blackbox.ai/chat/completions"
    )]
    upstream_url: String,

    /// Provider credential. Prefer the environment over the flag.
    #[arg(long = "api-key", env = "RELAY_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Pin every forwarded request to this model.
    #[arg(long, env = "RELAY_MODEL")]
    model: Option<String>,

    #[arg(long, env = "RELAY_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("RELAY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if args.api_key.trim().is_empty() {
        anyhow::bail!("RELAY_API_KEY must not be empty");
    }

    let upstream = ApiUpstream::new(UpstreamConfig {
        url: args.upstream_url,
        api_key: args.api_key,
        timeout: args.timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
    })
    .context("failed to build upstream client")?;
    tracing::info!(upstream = %upstream.endpoint(), model = ?args.model, "relay configured");

    let app = router(AppState {
        upstream: Arc::new(upstream),
        model: args.model.filter(|model| !model.trim().is_empty()),
    });

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("relay server stopped")?;

    Ok(())
}
