//! Summary server binary
//!
//! Run with: cargo run -p equip-summary --bin equip-summary-server [config.toml]

use std::path::PathBuf;

use equip_summary::{config::AppConfig, server::SummaryServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "equip_summary=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Database: {}", config.storage.database_path.display());
    tracing::info!("  - History capacity: {}", config.storage.history_capacity);
    tracing::info!("  - Required columns: {:?}", config.schema.required_columns);
    tracing::info!("  - Users: {}", config.auth.users.len());

    let server = SummaryServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}/api", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/login/    - Obtain tokens");
    println!("  POST /api/upload/   - Upload a CSV file");
    println!("  GET  /api/history/  - Recent uploads");
    println!("  GET  /api/report/   - PDF report");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
