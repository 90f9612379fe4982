//! Operational entrypoint: initializes the database and runs the hold-expiry
//! sweeper. The request-facing surfaces (HTTP, auth, catalog) live outside
//! this crate and talk to the engine through the `core` modules.

use boxoffice::config::{self, settings};
use boxoffice::core::holds;
use boxoffice::errors::Result;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing as early as possible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env non-fatally; env vars can be set externally
    dotenv().ok();

    let config = settings::load_default_config()?;
    info!(
        hold_ttl_minutes = config.booking.hold_ttl_minutes,
        sweep_interval_secs = config.booking.sweep_interval_secs,
        "loaded booking settings"
    );

    let db = config::database::create_connection().await?;
    config::database::create_tables(&db).await?;
    info!("database initialized");

    info!("starting hold-expiry sweeper");
    holds::run_expiry_sweep(db, config.booking.sweep_interval()).await;

    Ok(())
}
