// Expense Tracker - Web Server
// REST API with Axum over the in-memory expense store

use anyhow::{Context, Result};
use expense_tracker::api::{build_router, AppState};
use expense_tracker::{init_tracing, AppConfig};
use tracing::info;

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = AppConfig::load(None)?;
    init_tracing(&cfg.logging);

    let state = AppState::from_config(&cfg)?;
    info!(
        classifier = state.classifier_name(),
        scanning = state.scanning_enabled(),
        budget = cfg.budget,
        "expense tracker configured"
    );

    let app = build_router(state);

    // Start server
    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, version = expense_tracker::VERSION, "🚀 server listening");

    axum::serve(listener, app)
        .await
        .context("server terminated")?;

    Ok(())
}
