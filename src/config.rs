use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub discord_webhook_url: Option<String>,
    // when set, /api/cron/check-alerts requires a matching x-cron-secret header
    pub cron_secret: Option<String>,

    pub screener_base_url: String,
    pub scrape_delay_ms: u64,
    pub http_timeout_secs: u64,

    // in-process scheduler; disabled when unset
    pub alert_check_interval_secs: Option<u64>,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "ipotracker".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let screener_base_url = env::var("SCREENER_BASE_URL")
        .unwrap_or_else(|_| "https://www.screener.in".to_string());

    let scrape_delay_ms = env::var("SCRAPE_DELAY_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1000);

    let http_timeout_secs = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(20);

    let alert_check_interval_secs = optional("ALERT_CHECK_INTERVAL_SECS")
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0);

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        discord_webhook_url: optional("DISCORD_WEBHOOK_URL"),
        cron_secret: optional("CRON_SECRET"),
        screener_base_url,
        scrape_delay_ms,
        http_timeout_secs,
        alert_check_interval_secs,
    }
}
