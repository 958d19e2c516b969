//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use response_cache::{api::create_router, AppState, Config};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::from_config(&Config {
        max_cache_size: 100,
        ..Config::default()
    }))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(
            "/set",
            json!({"key": "test_key", "value": "test_value"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stored"], true);
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_endpoint_oversize_value() {
    let app = create_router(AppState::from_config(&Config {
        max_item_size: 32,
        ..Config::default()
    }));

    let response = app
        .clone()
        .oneshot(put_json(
            "/set",
            json!({"key": "big", "value": "x".repeat(128)}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app.oneshot(get("/get/big")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();
    let value = json!({"user": {"id": 7, "roles": ["admin", "dev"]}});

    app.clone()
        .oneshot(put_json("/set", json!({"key": "profile", "value": value})))
        .await
        .unwrap();

    let response = app.oneshot(get("/get/profile")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "profile");
    assert_eq!(json["value"], value);
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let response = app.oneshot(get("/get/nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_compressed_value_via_api() {
    let app = create_router(AppState::from_config(&Config {
        compression_enabled: true,
        compression_threshold_bytes: 64,
        ..Config::default()
    }));
    let rows = vec!["repeated row content"; 50];
    let value = json!({ "rows": rows });

    app.clone()
        .oneshot(put_json("/set", json!({"key": "report", "value": value})))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/get/report")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], value);

    let response = app.oneshot(get("/stats")).await.unwrap();
    let stats = body_to_json(response.into_body()).await;
    assert_eq!(stats["compressions"], 1);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json("/set", json!({"key": "gone", "value": 1})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/del/gone")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], true);

    let response = app.oneshot(get("/get/gone")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/del/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == INVALIDATE Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_endpoint_by_tags() {
    let app = create_test_app();

    for (key, tags) in [
        ("u1", json!(["users"])),
        ("u2", json!(["users", "profiles"])),
        ("p1", json!(["posts"])),
    ] {
        let response = app
            .clone()
            .oneshot(put_json("/set", json!({"key": key, "value": key, "tags": tags})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/invalidate", json!({"tags": ["users"]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);

    let response = app.clone().oneshot(get("/get/u2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/get/p1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalidate_endpoint_rejects_empty_tags() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json("/invalidate", json!({"tags": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint() {
    let app = create_test_app();

    for key in ["a", "b", "c"] {
        app.clone()
            .oneshot(put_json("/set", json!({"key": key, "value": key})))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(post_json("/clear", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["current_size"], 0);
    assert_eq!(json["total_size"], 0);
    assert_eq!(json["sets"], 3);
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(put_json(
            "/set",
            json!({"key": "stats_key", "value": "stats_value"}),
        ))
        .await
        .unwrap();

    // Hit
    app.clone().oneshot(get("/get/stats_key")).await.unwrap();
    // Miss
    app.clone().oneshot(get("/get/nonexistent")).await.unwrap();

    let response = app.oneshot(get("/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;

    assert_eq!(json["hits"].as_u64().unwrap(), 1);
    assert_eq!(json["misses"].as_u64().unwrap(), 1);
    assert_eq!(json["sets"].as_u64().unwrap(), 1);
    assert_eq!(json["current_size"].as_u64().unwrap(), 1);
    assert_eq!(json["max_size"].as_u64().unwrap(), 100);
    assert_eq!(json["hit_rate"].as_f64().unwrap(), 0.5);
    // "stats_value" serializes to 13 bytes including quotes
    assert_eq!(json["total_size"].as_u64().unwrap(), 13);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"].as_str().unwrap(), "healthy");
    assert!(json.get("timestamp").is_some());
    assert!(json["stats"].get("hit_rate").is_some());

    // The probe entry does not linger
    let response = app.oneshot(get("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["current_size"], 0);
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"invalid json"#))
                .unwrap(),
        )
        .await
        .unwrap();

    // Axum returns 400 or 422 for JSON body rejections
    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json("/set", json!({"key": "", "value": "test"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_zero_ttl_request() {
    let app = create_test_app();

    let response = app
        .oneshot(put_json(
            "/set",
            json!({"key": "k", "value": "v", "ttl_ms": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == TTL Expiration via API Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();

    let set_response = app
        .clone()
        .oneshot(put_json(
            "/set",
            json!({"key": "ttl_test", "value": "expires_soon", "ttl_ms": 100}),
        ))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.clone().oneshot(get("/get/ttl_test")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let get_response = app.oneshot(get("/get/ttl_test")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

// == Live Server Tests ==

#[tokio::test]
async fn test_live_server_roundtrip() {
    let state = AppState::from_config(&Config::default());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let response = client
        .put(format!("{base}/set"))
        .json(&json!({"key": "live", "value": {"n": 42}, "tags": ["demo"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = client
        .get(format!("{base}/get/live"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"]["n"], 42);

    let body: Value = client
        .post(format!("{base}/invalidate"))
        .json(&json!({"tags": ["demo"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["removed"], 1);

    let response = client
        .get(format!("{base}/get/live"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.abort();
}
