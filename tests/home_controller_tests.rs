use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use mongodb::Client;
use ipotracker::{config, routes, AppState};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let settings = config::load();

    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("mongodb client");
    let db = client.database(&settings.mongodb_db);

    AppState::new(db, settings).expect("app state")
}

async fn response_body_string(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&response_body_string(res).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .uri("/api/nothing-here")
        .body(axum::body::Body::empty())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body = response_body_string(res).await;
    assert!(body.contains("\"detail\""));
}

#[tokio::test]
async fn bulk_cmp_with_no_names_returns_empty_list() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/api/scrape/cmp/bulk")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"company_names":["  ",""]}"#))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = response_body_string(res).await;
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn groww_scrape_requires_url() {
    let app = routes::app(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/api/scrape/groww")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(r#"{"url":" "}"#))
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
