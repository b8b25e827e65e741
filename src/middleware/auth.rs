use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{models::CurrentUser, AppState};

pub const USER_HEADER: &str = "x-user-id";
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Puts a `CurrentUser` into the request extensions when the caller sent an
/// `x-user-id` header. Handlers that need a user reject requests without one.
pub async fn inject_current_user(
    State(_state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(id) = header_value(req.headers(), USER_HEADER) {
        req.extensions_mut().insert(CurrentUser { id });
    }

    next.run(req).await
}

/// Server-to-server calls must echo the configured cron secret. With no
/// secret configured every caller is accepted.
pub fn cron_secret_ok(state: &AppState, headers: &HeaderMap) -> bool {
    match state.settings.cron_secret.as_deref() {
        None => true,
        Some(expected) => header_value(headers, CRON_SECRET_HEADER).as_deref() == Some(expected),
    }
}
