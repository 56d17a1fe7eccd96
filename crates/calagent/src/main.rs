//! calagent HTTP server.
//!
//! Logging: set `RUST_LOG` (e.g. `calagent=debug`) to adjust what goes to stderr.

use std::sync::Arc;

use calagent::{CoreResult, Server, ServerState, Settings};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "calagent=info,calagent_llm=info,tower_http=info";

#[tokio::main]
async fn main() -> CoreResult<()> {
    let _ = dotenvy::dotenv();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let settings = Settings::load()?;
    tracing::info!(
        timezone = %settings.agent.timezone,
        backend = ?settings.calendar.backend,
        model = %settings.llm.model,
        "starting calagent"
    );
    if settings.llm.api_key.is_none() {
        tracing::warn!("no model API key configured; chat requests will fail");
    }

    let state = Arc::new(ServerState::from_settings(&settings)?);
    let mut server = Server::start(&settings.server.bind_addr, state).await?;

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
    server.shutdown()
}
