//! Library entrypoint for the IPO tracker.
//!
//! Both binaries (the API server and the one-shot cron runner) build on this
//! crate, and integration tests under `tests/` import the app state, routers,
//! controllers and services from here.

pub mod config;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub screener: services::screener::ScreenerClient,
    pub groww: services::groww::GrowwScraper,
    pub notifier: services::discord::DiscordNotifier,
}

impl AppState {
    /// Builds the HTTP collaborators from `settings`. The database handle is
    /// created by the caller.
    pub fn new(db: mongodb::Database, settings: config::Settings) -> Result<Self, String> {
        let timeout = std::time::Duration::from_secs(settings.http_timeout_secs);

        let screener =
            services::screener::ScreenerClient::new(settings.screener_base_url.clone(), timeout)?;
        let groww = services::groww::GrowwScraper::new(timeout)?;
        let notifier = services::discord::DiscordNotifier::new(settings.discord_webhook_url.clone());

        Ok(Self {
            db,
            settings,
            screener,
            groww,
            notifier,
        })
    }
}
