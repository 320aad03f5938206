//! ea-confirmation-server: serves the confirmation flow and the sample
//! application form.
//!
//! Config comes from the file named by EA_CONFIRM_CONFIG (YAML) when set,
//! otherwise from EA_CONFIRM_* environment variables. See `config.rs`.

use std::sync::Arc;

use anyhow::Context;
use ea_confirmation::api::{create_app, ConfirmationState};
use ea_confirmation::confirm::flash::{FlashTransport, MemoryFlashStore};
use ea_confirmation::confirm::store::{ConfirmationStore, MemoryConfirmationStore};
use ea_confirmation::confirm::sweeper::ExpirySweeper;
use ea_confirmation::ConfirmationConfig;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ea_confirmation=debug,tower_http=debug".into()),
        )
        .init();

    let config = match std::env::var("EA_CONFIRM_CONFIG") {
        Ok(path) => ConfirmationConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        Err(_) => ConfirmationConfig::from_env().context("invalid EA_CONFIRM_* environment")?,
    };

    let store: Arc<dyn ConfirmationStore> = Arc::new(MemoryConfirmationStore::new());
    let flash: Arc<dyn FlashTransport> = Arc::new(MemoryFlashStore::new(config.flash_ttl()));

    // Start expiry sweeper as background task
    let sweeper = ExpirySweeper::new(
        Arc::clone(&store),
        Arc::clone(&flash),
        config.sweep_interval(),
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });
    tracing::info!(
        "ExpirySweeper spawned (interval={}s)",
        config.sweep_interval_secs
    );

    let state = ConfirmationState::new(&config, store, flash)?;
    let app = create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!(
        "ea-confirmation listening on {} (confirmation page at {})",
        config.bind_addr,
        config.confirmation_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}
