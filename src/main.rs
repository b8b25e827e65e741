use std::net::SocketAddr;
use std::time::Duration;

use mongodb::Client;

use ipotracker::{config, routes, services, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = services::db_init::ensure_indexes(&db).await {
        tracing::warn!("could not ensure indexes: {}", e);
    }

    let state = AppState::new(db, settings.clone()).expect("Failed to build HTTP clients");

    // session cookies make screener.in searches less likely to be blocked
    state.screener.prime().await;

    if let Some(secs) = settings.alert_check_interval_secs {
        tracing::info!("alert scheduler running every {}s", secs);
        services::alert_monitor::spawn_alert_scheduler(state.clone(), Duration::from_secs(secs));
    }

    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind");
    axum::serve(listener, app).await.expect("server error");
}
