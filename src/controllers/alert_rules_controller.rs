use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    models::CurrentUser,
    services::alert_rules_service::{self, NewRule, RulePatch, RuleUpdateError},
    AppState,
};

use super::{db_error, detail, parse_id, unauthorized, with_hex_id};

// GET /api/alert-rules
pub async fn list_rules(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match alert_rules_service::list_user_rules(&state, &u.id).await {
        Ok(rules) => {
            let items: Vec<serde_json::Value> =
                rules.iter().map(|r| with_hex_id(r, r.id)).collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => db_error(e),
    }
}

// POST /api/alert-rules
// One rule per scope: posting again for the same scope replaces its thresholds.
pub async fn create_rule(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<NewRule>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let scope = match body.scope() {
        Ok(s) => s,
        Err(msg) => return detail(StatusCode::BAD_REQUEST, msg),
    };
    if let Err(msg) = alert_rules_service::validate_thresholds(body.gain_pct, body.loss_pct) {
        return detail(StatusCode::BAD_REQUEST, msg);
    }

    match alert_rules_service::upsert_rule(&state, &u.id, scope, body.gain_pct, body.loss_pct).await {
        Ok((rule, created)) => {
            let status = if created { StatusCode::CREATED } else { StatusCode::OK };
            (status, Json(with_hex_id(&rule, rule.id))).into_response()
        }
        Err(e) => db_error(e),
    }
}

// PUT /api/alert-rules/:id
pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    Json(patch): Json<RulePatch>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match alert_rules_service::update_rule(&state, &u.id, oid, &patch).await {
        Ok(Some(rule)) => (StatusCode::OK, Json(with_hex_id(&rule, rule.id))).into_response(),
        Ok(None) => detail(StatusCode::NOT_FOUND, "Alert rule not found"),
        Err(RuleUpdateError::Invalid(msg)) => detail(StatusCode::BAD_REQUEST, msg),
        Err(RuleUpdateError::Db(e)) => db_error(e),
    }
}

// DELETE /api/alert-rules/:id
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };
    let oid = match parse_id(&id) {
        Ok(x) => x,
        Err(res) => return res,
    };

    match alert_rules_service::delete_rule(&state, &u.id, oid).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Alert rule deleted" }))).into_response(),
        Err(e) => db_error(e),
    }
}
