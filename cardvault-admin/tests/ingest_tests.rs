//! Card ingestion tests
//!
//! Normalization into rows, image slots, and default-location fallback.

mod helpers;

use cardvault_admin::services::LocationInput;
use cardvault_common::db::MULTI_FACE_TYPE_LINE;
use cardvault_common::Error;
use helpers::{fire_ice, simple_card, TestEnv};
use serde_json::json;

async fn instance_rows(env: &TestEnv, scryfall_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM card_instances WHERE scryfall_id = ?")
        .bind(scryfall_id)
        .fetch_one(&env.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_add_then_readd_increments() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let raw = simple_card("abc-123", "Lightning Bolt");

    let first = env
        .state
        .ingest
        .add_card(&env.ctx, &raw, Some(a.id), 1)
        .await
        .unwrap();
    assert!(first.card_created);
    assert!(first.instance_created);
    assert_eq!(first.quantity, 1);
    assert_eq!(first.message, "Card added to library successfully");

    let second = env
        .state
        .ingest
        .add_card(&env.ctx, &raw, Some(a.id), 1)
        .await
        .unwrap();
    assert!(!second.card_created);
    assert!(!second.instance_created);
    assert_eq!(second.card_id, first.card_id);
    assert_eq!(second.quantity, 2);
    assert_eq!(
        second.message,
        "Card quantity updated to 2 at the selected location"
    );

    assert_eq!(instance_rows(&env, "abc-123").await, 1);
    let card = env.state.cards.find(first.card_id).await.unwrap();
    assert_eq!(card.name, "Lightning Bolt");
    assert_eq!(card.type_line.as_deref(), Some("Instant"));
    assert_eq!(card.scryfall_json.0["id"], "abc-123");
}

#[tokio::test]
async fn test_split_card_faces_and_images() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/fire.jpg", b"fire");
    env.source.put_asset("https://img.test/ice.png", b"ice");

    let outcome = env
        .state
        .ingest
        .add_card(&env.ctx, &fire_ice(), Some(a.id), 1)
        .await
        .unwrap();
    let card = env.state.cards.find(outcome.card_id).await.unwrap();

    assert_eq!(card.name, "Fire // Ice");
    assert_eq!(card.layout, "split");
    assert_eq!(card.type_line.as_deref(), Some(MULTI_FACE_TYPE_LINE));
    assert_eq!(card.cfl_name.as_deref(), Some("Fire"));
    assert_eq!(card.cfr_name.as_deref(), Some("Ice"));
    assert_eq!(card.cfr_mana_cost.as_deref(), Some("{1}{U}"));

    assert_eq!(card.image_uri, None);
    assert_eq!(card.cfl_image_uri.as_deref(), Some("front/fire-ice-1_face0.jpg"));
    assert_eq!(card.cfr_image_uri.as_deref(), Some("back/fire-ice-1_face1.png"));
    assert!(env.store.exists("front/fire-ice-1_face0.jpg").await);
    assert!(env.store.exists("back/fire-ice-1_face1.png").await);
}

#[tokio::test]
async fn test_single_image_goes_to_primary_slot() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    env.source.put_asset("https://img.test/bolt.jpg", b"bolt");

    let mut raw = simple_card("abc-123", "Lightning Bolt");
    raw["image_uris"] = json!({"normal": "https://img.test/bolt.jpg"});

    let outcome = env
        .state
        .ingest
        .add_card(&env.ctx, &raw, Some(a.id), 1)
        .await
        .unwrap();
    let card = env.state.cards.find(outcome.card_id).await.unwrap();

    assert_eq!(card.image_uri.as_deref(), Some("front/abc-123.jpg"));
    assert_eq!(card.cfl_image_uri, None);
    assert_eq!(card.cfr_image_uri, None);
}

#[tokio::test]
async fn test_failed_image_download_still_ingests() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;

    let mut raw = simple_card("abc-123", "Lightning Bolt");
    raw["image_uris"] = json!({"normal": "https://img.test/missing.jpg"});

    let outcome = env
        .state
        .ingest
        .add_card(&env.ctx, &raw, Some(a.id), 1)
        .await
        .unwrap();
    let card = env.state.cards.find(outcome.card_id).await.unwrap();

    assert_eq!(card.image_uri, None);
    assert_eq!(env.source.asset_requests(), vec!["https://img.test/missing.jpg"]);
    assert_eq!(env.quantity("abc-123", a.id).await, Some(1));
}

#[tokio::test]
async fn test_readd_leaves_metadata_untouched() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;
    let b = env.location("Box B").await;

    env.card_at("abc-123", a.id, 1).await;
    let renamed = simple_card("abc-123", "Renamed Upstream");
    let outcome = env
        .state
        .ingest
        .add_card(&env.ctx, &renamed, Some(b.id), 1)
        .await
        .unwrap();

    assert!(outcome.instance_created);
    let card = env.state.cards.find(outcome.card_id).await.unwrap();
    assert_eq!(card.name, "Test Card");
    assert_eq!(env.quantity("abc-123", a.id).await, Some(1));
    assert_eq!(env.quantity("abc-123", b.id).await, Some(1));
}

#[tokio::test]
async fn test_default_location_fallback() {
    let env = TestEnv::new().await;
    env.location("Box A").await;
    let home = env
        .location_with(LocationInput {
            name: "Home".to_string(),
            location_type: "Storage".to_string(),
            is_default: true,
            ..Default::default()
        })
        .await;

    let outcome = env
        .state
        .ingest
        .add_card(&env.ctx, &simple_card("abc-123", "Bolt"), None, 1)
        .await
        .unwrap();

    assert_eq!(outcome.location_id, home.id);
    assert_eq!(env.quantity("abc-123", home.id).await, Some(1));
}

#[tokio::test]
async fn test_missing_location_is_rejected() {
    let env = TestEnv::new().await;
    env.location("Box A").await;

    let no_default = env
        .state
        .ingest
        .add_card(&env.ctx, &simple_card("abc-123", "Bolt"), None, 1)
        .await;
    assert!(matches!(no_default, Err(Error::Validation { ref field, .. }) if field == "location_id"));

    let unknown = env
        .state
        .ingest
        .add_card(&env.ctx, &simple_card("abc-123", "Bolt"), Some(9999), 1)
        .await;
    assert!(matches!(unknown, Err(Error::NotFound(_))));

    let cards: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(cards, 0);
}

#[tokio::test]
async fn test_payload_without_id_is_rejected() {
    let env = TestEnv::new().await;
    let a = env.location("Box A").await;

    let result = env
        .state
        .ingest
        .add_card(&env.ctx, &json!({"name": "No Id"}), Some(a.id), 1)
        .await;
    assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "scryfall_data.id"));

    let result = env
        .state
        .ingest
        .add_card(&env.ctx, &json!("not an object"), Some(a.id), 1)
        .await;
    assert!(matches!(result, Err(Error::Validation { .. })));
}
