//! One-shot alert check for external schedulers (cron, CI jobs).

use std::process::ExitCode;

use mongodb::Client;

use ipotracker::{config, services::alert_monitor, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    let client = match Client::with_uri_str(&settings.mongodb_uri).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to connect to MongoDB: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let db = client.database(&settings.mongodb_db);

    let state = match AppState::new(db, settings) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to build HTTP clients: {}", e);
            return ExitCode::FAILURE;
        }
    };

    state.screener.prime().await;

    match alert_monitor::run_with_state(&state).await {
        Ok(summary) => {
            tracing::info!(
                "alert check complete: {} checked, {} prices, {} triggered, {} sent",
                summary.ipos_checked,
                summary.cmp_fetched,
                summary.alerts_triggered,
                summary.alerts_sent
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("alert check failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
