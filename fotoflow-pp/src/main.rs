//! fotoflow-pp - Photo Pipeline Service
//!
//! Ingests event-photo batches, attributes photos to registered people using
//! QR markers and filename order (Phase 1), and delivers per-person photo
//! sets to remote object storage with share links (Phase 2).

use anyhow::Result;
use fotoflow_common::config::StorageLayout;
use fotoflow_common::events::EventBus;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fotoflow_pp::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting fotoflow-pp (Photo Pipeline) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve data root: CLI arg, env var, config file, OS default
    let cli_root = std::env::args().nth(1);
    let root = fotoflow_common::config::resolve_data_root(cli_root.as_deref(), "FOTOFLOW_DATA")?;
    let layout = StorageLayout::new(root);
    layout.ensure_base_dirs()?;
    info!("Data root: {}", layout.root().display());

    let db_path = layout.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = fotoflow_pp::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100);
    let state = AppState::new(db_pool, event_bus, layout);
    let app = fotoflow_pp::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5761").await?;
    info!("Listening on http://127.0.0.1:5761");
    info!("Health check: http://127.0.0.1:5761/health");

    axum::serve(listener, app).await?;

    Ok(())
}
