use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use volunflow_api::app::{app, AppState};
use volunflow_api::auth::TokenService;
use volunflow_api::config::AppConfig;
use volunflow_api::mail::{EmailSender, Notifier, SmtpMailer};
use volunflow_api::media::MediaStore;
use volunflow_api::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up MONGO_URI, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Misconfiguration (missing JWT secret, bad store URI) aborts startup.
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("starting volunflow API in {:?} mode", config.environment);

    // Connect and ping up front; an unreachable store is fatal and there is
    // no implicit reconnect logic beyond the driver's own.
    let store = Store::connect(&config.store)
        .await
        .context("document store unreachable")?;

    let media = MediaStore::new(&config.server.media_dir);
    media.ensure_dir().await.context("cannot create media directory")?;

    let tokens = TokenService::new(&config.security.jwt_secret, config.security.token_ttl_secs);

    let sender: Arc<dyn EmailSender> = Arc::new(SmtpMailer::new(&config.smtp)?);
    let notifier = Notifier::new(sender, &config.smtp.contact_inbox);

    let port = config.server.port;
    let state = AppState {
        store,
        tokens,
        notifier,
        media,
        config: Arc::new(config),
    };

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
