use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use geeklogg::config::Config;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Default API key seeded by migration (must match m20250901_initial.rs)
const DEFAULT_API_KEY: &str = "geeklogg_default_api_key_please_regenerate";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = geeklogg::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    geeklogg::api::router(state).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-Api-Key", DEFAULT_API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("X-Api-Key", DEFAULT_API_KEY)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_auth_endpoints() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header("X-Api-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/system/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_flow() {
    let app = spawn_app().await;

    let bad_login = serde_json::json!({"username": "admin", "password": "wrong"});
    let response = app
        .clone()
        .oneshot(post_json("/api/auth/login", &bad_login))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let login = serde_json::json!({"username": "admin", "password": "password"});
    let response = app
        .clone()
        .oneshot(post_json("/api/auth/login", &login))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["api_key"], DEFAULT_API_KEY);
}

#[tokio::test]
async fn test_media_crud() {
    let app = spawn_app().await;

    let entry = serde_json::json!({
        "title": "Chrono Trigger",
        "kind": "games",
        "status": "completed",
        "rating": 5.0,
        "hours_spent": 23.5,
        "tags": ["jrpg", "snes"]
    });

    let response = app
        .clone()
        .oneshot(post_json("/api/media", &entry))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = body_json(response).await;
    assert_eq!(created["data"]["title"], "Chrono Trigger");
    assert_eq!(created["data"]["kind"], "games");
    let id = created["data"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/media/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated_entry = serde_json::json!({
        "title": "Chrono Trigger",
        "kind": "games",
        "status": "in_progress",
        "hours_spent": 30.0
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/media/{id}"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&updated_entry).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "in_progress");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/media/{id}"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/media/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_invariants_rejected() {
    let app = spawn_app().await;

    // Rating above 5
    let bad_rating = serde_json::json!({
        "title": "Some Game",
        "kind": "games",
        "status": "completed",
        "rating": 6.0
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/media", &bad_rating))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Page progress past the end of the book
    let bad_pages = serde_json::json!({
        "title": "Some Book",
        "kind": "books",
        "status": "in_progress",
        "current_page": 500,
        "total_pages": 300
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/media", &bad_pages))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty title
    let empty_title = serde_json::json!({
        "title": "  ",
        "kind": "movies",
        "status": "planned"
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/media", &empty_title))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown kind is rejected at deserialization
    let bad_kind = serde_json::json!({
        "title": "Thing",
        "kind": "podcast",
        "status": "planned"
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/media", &bad_kind))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_media_list_filters_and_stats() {
    let app = spawn_app().await;

    for (title, kind, status, hours) in [
        ("Disco Elysium", "games", "completed", 40.0),
        ("Dune", "books", "in_progress", 6.0),
        ("Frieren", "anime", "completed", 12.0),
    ] {
        let entry = serde_json::json!({
            "title": title,
            "kind": kind,
            "status": status,
            "hours_spent": hours,
            "rating": 4.0
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/media", &entry))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get("/api/media?kind=games"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["title"], "Disco Elysium");

    let response = app
        .clone()
        .oneshot(get("/api/media?status=completed"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/media?kind=vinyl"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.clone().oneshot(get("/api/media/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total_entries"], 3);
    assert_eq!(body["data"]["by_kind"]["games"], 1);
    assert_eq!(body["data"]["by_status"]["completed"], 2);
    let total_hours = body["data"]["total_hours"].as_f64().unwrap();
    assert!((total_hours - 58.0).abs() < 0.01);
}

#[tokio::test]
async fn test_system_status_shape() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/system/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total_users"], 1);
    assert_eq!(body["data"]["total_entries"], 0);
    assert_eq!(body["data"]["webhook_backlog"]["pending"], 0);
    assert_eq!(body["data"]["stripe_enabled"], false);
}

#[tokio::test]
async fn test_system_config_redacts_secrets() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/system/config"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["stripe"]["secret_key"], "");
    assert_eq!(body["data"]["mercadopago"]["access_token"], "");
    assert!(body["data"]["igdb"]["requests_per_second"].is_number());
}

#[tokio::test]
async fn test_igdb_status_endpoint() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(get("/api/igdb/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["token"]["valid"], false);
    assert_eq!(body["data"]["window_capacity"], 4);
    assert_eq!(body["data"]["window_in_flight"], 0);
}

#[tokio::test]
async fn test_search_rejects_bad_input() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/search/vinyl?q=test"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/search/games?q=%20%20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
