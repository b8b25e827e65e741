use axum::{
    http::{header, Request, StatusCode},
    routing::{get, put},
    Router,
};
use http_body_util::BodyExt;
use mongodb::Client;
use ipotracker::{config, controllers::alert_rules_controller, AppState};
use ipotracker::models::CurrentUser;
use tower::ServiceExt;

async fn test_state() -> AppState {
    let settings = config::load();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    AppState::new(db, settings).expect("app state")
}

fn rules_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/alert-rules",
            get(alert_rules_controller::list_rules).post(alert_rules_controller::create_rule),
        )
        .route("/api/alert-rules/:id", put(alert_rules_controller::update_rule))
        .with_state(state)
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

fn post_rule(body: &'static str) -> Request<axum::body::Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/api/alert-rules")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .unwrap();
    req.extensions_mut().insert(CurrentUser {
        id: "user-1".to_string(),
    });
    req
}

#[tokio::test]
async fn list_rules_unauthorized_returns_401() {
    let app = rules_router(test_state().await);

    let req = Request::builder()
        .uri("/api/alert-rules")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_rule_with_positive_loss_returns_400() {
    let app = rules_router(test_state().await);

    let res = app
        .oneshot(post_rule(r#"{"type":"base","gain_pct":10,"loss_pct":5}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("loss_pct must be less than 0"));
}

#[tokio::test]
async fn create_rule_with_zero_gain_returns_400() {
    let app = rules_router(test_state().await);

    let res = app
        .oneshot(post_rule(r#"{"type":"base","gain_pct":0}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("gain_pct must be greater than 0"));
}

#[tokio::test]
async fn company_rule_without_company_name_returns_400() {
    let app = rules_router(test_state().await);

    let res = app
        .oneshot(post_rule(r#"{"type":"company","gain_pct":10,"loss_pct":-5}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("company_name"));
}

#[tokio::test]
async fn unknown_rule_type_returns_400() {
    let app = rules_router(test_state().await);

    let res = app
        .oneshot(post_rule(r#"{"type":"global"}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = response_body_string(res).await;
    assert!(body.contains("unknown rule type"));
}

#[tokio::test]
async fn update_rule_with_bad_id_returns_400() {
    let app = rules_router(test_state().await);

    let mut req = Request::builder()
        .method("PUT")
        .uri("/api/alert-rules/xyz")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"gain_pct":20}"#))
        .unwrap();
    req.extensions_mut().insert(CurrentUser {
        id: "user-1".to_string(),
    });

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
