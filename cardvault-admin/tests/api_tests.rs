//! HTTP API tests
//!
//! Drive the router in-process and check status codes and JSON bodies.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cardvault_admin::build_router;
use helpers::{simple_card, TestEnv};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(env: &TestEnv) -> Router {
    build_router(env.state.clone())
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let env = TestEnv::new().await;
    let (status, body) = send(router(&env), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cardvault-admin");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_add_card_and_list() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;

    let (status, body) = send(
        router(&env),
        "POST",
        "/api/cards",
        Some(json!({
            "scryfall_data": simple_card("abc-123", "Lightning Bolt"),
            "location_id": a.id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Card added to library successfully");
    assert_eq!(body["quantity"], 1);

    let (status, body) = send(router(&env), "GET", "/api/cards", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Lightning Bolt");
    assert_eq!(body["data"][0]["total_quantity"], 1);
    assert_eq!(body["data"][0]["locations"][0]["location_name"], "Box A");
}

#[tokio::test]
async fn test_add_card_without_id_is_validation_error() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;

    let (status, body) = send(
        router(&env),
        "POST",
        "/api/cards",
        Some(json!({"scryfall_data": {"name": "No Id"}, "location_id": a.id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "scryfall_data.id");
}

#[tokio::test]
async fn test_insufficient_move_is_unprocessable() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let b = env.location("Box B").await;
    let card_id = env.card_at("abc-123", a.id, 1).await;

    let (status, body) = send(
        router(&env),
        "POST",
        &format!("/api/cards/{}/move", card_id),
        Some(json!({"quantity": 2, "from_location_id": a.id, "to_location_id": b.id})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_QUANTITY");
    assert_eq!(body["error"]["message"], "Not enough cards at source location");

    let (status, body) = send(
        router(&env),
        "POST",
        &format!("/api/cards/{}/move", card_id),
        Some(json!({"quantity": 1, "from_location_id": a.id, "to_location_id": b.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from_quantity"], 0);
    assert_eq!(body["to_quantity"], 1);
}

#[tokio::test]
async fn test_card_detail_and_missing_card() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let card_id = env.card_at("abc-123", a.id, 2).await;

    let (status, body) = send(router(&env), "GET", &format!("/api/cards/{}", card_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scryfall_id"], "abc-123");
    assert_eq!(body["instances"][0]["quantity"], 2);

    let (status, body) = send(router(&env), "GET", "/api/cards/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_remove_and_delete_card() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let card_id = env.card_at("abc-123", a.id, 3).await;

    let (status, body) = send(
        router(&env),
        "POST",
        &format!("/api/cards/{}/remove", card_id),
        Some(json!({"quantity": 1, "location_id": a.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 2);

    let (status, body) = send(router(&env), "DELETE", &format!("/api/cards/{}", card_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Card and all instances deleted successfully");
    assert_eq!(body["instances_removed"], 1);
}

#[tokio::test]
async fn test_refresh_upstream_failure_is_bad_gateway() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let card_id = env.card_at("abc-123", a.id, 1).await;

    let (status, body) = send(
        router(&env),
        "POST",
        &format!("/api/cards/{}/refresh", card_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn test_location_crud() {
    let env = TestEnv::new().await;

    let (status, body) = send(
        router(&env),
        "POST",
        "/api/locations",
        Some(json!({"name": "Main Deck", "location_type": "Deck", "deck_type": "Commander"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Location created successfully.");
    let id = body["location"]["id"].as_i64().unwrap();

    let (status, body) = send(
        router(&env),
        "POST",
        "/api/locations",
        Some(json!({"name": "", "location_type": "Storage"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "name");

    let (status, body) = send(router(&env), "GET", "/api/locations/eligible-parents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["label"], "Main Deck (Commander)");

    let (status, body) = send(
        router(&env),
        "PUT",
        &format!("/api/locations/{}", id),
        Some(json!({"name": "Main Deck", "location_type": "Deck", "deck_type": "Standard"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["deck_type"], "Standard");

    let (status, _) = send(router(&env), "DELETE", &format!("/api/locations/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(router(&env), "GET", &format!("/api/locations/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_set_sync_statuses() {
    let env = TestEnv::new().await;

    env.source.set_sets(None);
    let (status, body) = send(router(&env), "POST", "/api/sets/sync", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["imported"], 0);

    env.source
        .set_sets(Some(vec![json!({"code": "lea", "name": "Limited Edition Alpha"})]));
    let (status, body) = send(router(&env), "POST", "/api/sets/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 1);

    let (status, body) = send(router(&env), "GET", "/api/sets?search=alpha&sort=name_asc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sets"]["data"][0]["set_code"], "lea");
    assert_eq!(body["filters"]["sort"], "name_asc");
}

#[tokio::test]
async fn test_stored_images_are_served() {
    let env = TestEnv::new().await;
    env.store.put("front/abc-123.jpg", b"jpeg-bytes").await.unwrap();

    let response = router(&env)
        .oneshot(
            Request::builder()
                .uri("/storage/front/abc-123.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"jpeg-bytes");
}

#[tokio::test]
async fn test_staging_folders_are_not_served() {
    let env = TestEnv::new().await;
    let root = env.store.root().to_path_buf();
    for folder in [".trash", ".tmp"] {
        std::fs::create_dir_all(root.join(folder)).unwrap();
        std::fs::write(root.join(folder).join("leftover.jpg"), b"hidden").unwrap();
    }
    env.store.put("sets/lea.svg", b"<svg/>").await.unwrap();

    for uri in [
        "/storage/.trash/leftover.jpg",
        "/storage/.tmp/leftover.jpg",
        "/storage/front/../.trash/leftover.jpg",
    ] {
        let (status, _) = send(router(&env), "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }

    let response = router(&env)
        .oneshot(
            Request::builder()
                .uri("/storage/sets/lea.svg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_add_card_to_unknown_location_is_not_found() {
    let env = TestEnv::new().await;
    env.location("Box A").await;

    let (status, body) = send(
        router(&env),
        "POST",
        "/api/cards",
        Some(json!({
            "scryfall_data": simple_card("abc-123", "Lightning Bolt"),
            "location_id": 9999
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
