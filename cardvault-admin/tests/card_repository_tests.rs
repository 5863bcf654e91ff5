//! Card repository tests
//!
//! Refresh from the data source and card deletion with image cleanup.

mod helpers;

use cardvault_common::db::MULTI_FACE_TYPE_LINE;
use cardvault_common::Error;
use helpers::{simple_card, TestEnv};
use serde_json::json;

fn bolt_with_image() -> serde_json::Value {
    let mut raw = simple_card("abc-123", "Lightning Bolt");
    raw["image_uris"] = json!({"normal": "https://img.test/bolt.jpg"});
    raw
}

async fn ingest(env: &TestEnv, raw: &serde_json::Value, location_id: i64) -> i64 {
    env.state
        .ingest
        .add_card(&env.ctx, raw, Some(location_id), 1)
        .await
        .unwrap()
        .card_id
}

#[tokio::test]
async fn test_upsert_from_payload_creates_once() {
    let env = TestEnv::new().await;

    let (card, created) = env
        .state
        .cards
        .upsert_from_payload(&json!({"id": "xyz-9"}))
        .await
        .unwrap();
    assert!(created);
    assert_eq!(card.name, "");
    assert_eq!(card.layout, "normal");
    assert_eq!(card.lang, "en");

    let (again, created) = env
        .state
        .cards
        .upsert_from_payload(&simple_card("xyz-9", "Other Name"))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, card.id);
    assert_eq!(again.name, "");

    let by_external = env.state.cards.find_by_external_id("xyz-9").await.unwrap();
    assert_eq!(by_external.id, card.id);
}

#[tokio::test]
async fn test_refresh_updates_fields_and_replaces_images() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;
    assert!(env.store.exists("front/abc-123.jpg").await);

    // upstream now reports the card as double-faced
    env.source.put_asset("https://img.test/day.png", b"day");
    env.source.put_asset("https://img.test/night.png", b"night");
    env.source.put_card(json!({
        "id": "abc-123",
        "name": "Day // Night",
        "layout": "transform",
        "card_faces": [
            {"name": "Day", "type_line": "Creature", "image_uris": {"normal": "https://img.test/day.png"}},
            {"name": "Night", "type_line": "Creature", "image_uris": {"normal": "https://img.test/night.png"}}
        ]
    }));

    let card = env.state.cards.refresh(&env.ctx, card_id).await.unwrap();

    assert_eq!(card.name, "Day // Night");
    assert_eq!(card.layout, "transform");
    // absent lang keeps the stored value
    assert_eq!(card.lang, "en");
    assert_eq!(card.type_line.as_deref(), Some(MULTI_FACE_TYPE_LINE));
    assert_eq!(card.cfl_name.as_deref(), Some("Day"));
    assert_eq!(card.image_uri, None);
    assert_eq!(card.cfl_image_uri.as_deref(), Some("front/abc-123_face0.png"));
    assert_eq!(card.cfr_image_uri.as_deref(), Some("back/abc-123_face1.png"));
    assert_eq!(card.scryfall_json.0["layout"], "transform");

    assert!(!env.store.exists("front/abc-123.jpg").await);
    assert!(env.store.exists("front/abc-123_face0.png").await);
    assert!(env.store.exists("back/abc-123_face1.png").await);
}

#[tokio::test]
async fn test_refresh_keeps_image_with_same_path() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;

    let mut upstream = bolt_with_image();
    upstream["oracle_text"] = json!("Lightning Bolt deals 3 damage to any target.");
    env.source.put_card(upstream);

    let card = env.state.cards.refresh(&env.ctx, card_id).await.unwrap();
    assert_eq!(card.image_uri.as_deref(), Some("front/abc-123.jpg"));
    assert_eq!(
        card.oracle_text.as_deref(),
        Some("Lightning Bolt deals 3 damage to any target.")
    );
    assert!(env.store.exists("front/abc-123.jpg").await);
}

#[tokio::test]
async fn test_refresh_upstream_failure_changes_nothing() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;
    let before = env.state.cards.find(card_id).await.unwrap();

    // the stub source has no payload for this id
    env.source.remove_card("abc-123");
    let err = env.state.cards.refresh(&env.ctx, card_id).await.unwrap_err();
    match err {
        Error::Upstream(msg) => assert_eq!(msg, "Failed to fetch card data from Scryfall API"),
        other => panic!("unexpected error: {other:?}"),
    }

    let after = env.state.cards.find(card_id).await.unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.updated_at, before.updated_at);
    assert!(env.store.exists("front/abc-123.jpg").await);
}

#[tokio::test]
async fn test_refresh_missing_card_is_not_found() {
    let env = TestEnv::new().await;
    let result = env.state.cards.refresh(&env.ctx, 9999).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_delete_removes_instances_and_images() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let b = env.location("Box B").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;
    env.state.ledger.add(&env.ctx, card_id, b.id, 2).await.unwrap();
    env.card_at("def-456", a.id, 1).await;

    let deleted = env.state.cards.delete(&env.ctx, card_id).await.unwrap();

    assert_eq!(deleted.scryfall_id, "abc-123");
    assert_eq!(deleted.instances_removed, 2);
    assert_eq!(deleted.images_removed, 1);
    assert!(!env.store.exists("front/abc-123.jpg").await);
    assert!(matches!(
        env.state.cards.find(card_id).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(env.quantity("abc-123", a.id).await, None);
    assert_eq!(env.quantity("def-456", a.id).await, Some(1));
}

#[tokio::test]
async fn test_delete_tolerates_missing_image_file() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;
    env.store.delete("front/abc-123.jpg").await.unwrap();

    let deleted = env.state.cards.delete(&env.ctx, card_id).await.unwrap();
    assert_eq!(deleted.images_removed, 0);
    assert_eq!(deleted.instances_removed, 1);
}

#[tokio::test]
async fn test_delete_missing_card_is_not_found() {
    let env = TestEnv::new().await;
    let result = env.state.cards.delete(&env.ctx, 9999).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_refresh_write_failure_restores_images() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;
    let before = env.state.cards.find(card_id).await.unwrap();

    sqlx::query(
        "CREATE TRIGGER block_card_rename BEFORE UPDATE OF name ON cards \
         BEGIN SELECT RAISE(ABORT, 'card writes blocked'); END",
    )
    .execute(&env.pool)
    .await
    .unwrap();

    env.source.put_asset("https://img.test/day.png", b"day");
    env.source.put_asset("https://img.test/night.png", b"night");
    env.source.put_card(json!({
        "id": "abc-123",
        "name": "Day // Night",
        "layout": "transform",
        "card_faces": [
            {"name": "Day", "type_line": "Creature", "image_uris": {"normal": "https://img.test/day.png"}},
            {"name": "Night", "type_line": "Creature", "image_uris": {"normal": "https://img.test/night.png"}}
        ]
    }));

    let result = env.state.cards.refresh(&env.ctx, card_id).await;
    assert!(matches!(result, Err(Error::Database(_))));

    let after = env.state.cards.find(card_id).await.unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.layout, before.layout);
    assert_eq!(after.image_uri.as_deref(), Some("front/abc-123.jpg"));
    assert_eq!(after.cfl_image_uri, None);
    assert_eq!(after.updated_at, before.updated_at);

    assert!(env.store.exists("front/abc-123.jpg").await);
    assert!(!env.store.exists("front/abc-123_face0.png").await);
    assert!(!env.store.exists("back/abc-123_face1.png").await);
    assert_eq!(env.quantity("abc-123", a.id).await, Some(1));
}

#[tokio::test]
async fn test_delete_write_failure_keeps_card_and_images() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let b = env.location("Box B").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");
    let card_id = ingest(&env, &bolt_with_image(), a.id).await;
    env.state.ledger.add(&env.ctx, card_id, b.id, 2).await.unwrap();

    sqlx::query(
        "CREATE TRIGGER block_card_delete BEFORE DELETE ON cards \
         BEGIN SELECT RAISE(ABORT, 'card deletes blocked'); END",
    )
    .execute(&env.pool)
    .await
    .unwrap();

    let result = env.state.cards.delete(&env.ctx, card_id).await;
    assert!(matches!(result, Err(Error::Database(_))));

    let card = env.state.cards.find(card_id).await.unwrap();
    assert_eq!(card.image_uri.as_deref(), Some("front/abc-123.jpg"));
    assert!(env.store.exists("front/abc-123.jpg").await);
    // instance deletes ran first and were rolled back with the card delete
    assert_eq!(env.quantity("abc-123", a.id).await, Some(1));
    assert_eq!(env.quantity("abc-123", b.id).await, Some(2));
}
