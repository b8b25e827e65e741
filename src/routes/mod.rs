use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::cors::CorsLayer;

use crate::{AppState, controllers::home_controller};

pub mod home_routes;
pub mod sectors_routes;
pub mod ipos_routes;
pub mod alert_rules_routes;
pub mod scrape_routes;
pub mod cron_routes;
pub mod portfolio_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = sectors_routes::add_routes(router);
    let router = ipos_routes::add_routes(router);
    let router = alert_rules_routes::add_routes(router);
    let router = scrape_routes::add_routes(router);
    let router = cron_routes::add_routes(router);
    let router = portfolio_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
