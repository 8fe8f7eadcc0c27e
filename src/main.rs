use anyhow::{Context, Result};
use media_console::{
    config::AppConfig, handlers::AppState, routes::routes::dispatch,
    services::asset_service::AssetService, services::gateway::HttpGateway, session::Session,
};
use std::{io, sync::Arc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup (stderr, so stdout stays pipeable) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // --- Parse config + command ---
    let (cfg, command) = AppConfig::from_env_and_args()?;

    tracing::debug!(
        api_url = %cfg.api_url,
        authenticated = cfg.token.is_some(),
        expires_in = cfg.expires_in,
        "starting media-console"
    );

    // --- Session ---
    let session = Arc::new(Session::new(cfg.token.clone()));
    session.on_unauthorized(|event| {
        tracing::error!(
            endpoint = %event.endpoint,
            "session expired or token rejected; sign in again and update MEDIA_CONSOLE_TOKEN"
        );
    });

    // --- Initialize core service ---
    let gateway = HttpGateway::new(&cfg.api_url, session, cfg.timeout)
        .with_context(|| format!("connecting to {}", cfg.api_url))?;
    let state = AppState {
        service: Arc::new(AssetService::new(gateway)),
        config: cfg,
    };

    dispatch(&state, command).await
}
