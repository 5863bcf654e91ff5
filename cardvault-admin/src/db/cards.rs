//! Card database operations
//!
//! Plain queries over the cards table plus the explicit joins used by the
//! card listing and detail views.

use crate::pagination::{calculate_pagination, Page};
use crate::services::image_materializer::ImagePaths;
use crate::services::normalizer::NormalizedCard;
use cardvault_common::db::Card;
use cardvault_common::Result;
use cardvault_common::time;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, Row, SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::HashMap;

const CARD_COLUMNS: &str = "id, scryfall_id, name, layout, lang, \
     type_line, mana_cost, oracle_text, \
     cfl_name, cfl_mana_cost, cfl_type_line, cfl_oracle_text, \
     cfr_name, cfr_mana_cost, cfr_type_line, cfr_oracle_text, \
     image_uri, cfl_image_uri, cfr_image_uri, scryfall_json, created_at, updated_at";

/// Quantity of a card at one named location
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LocationQuantity {
    pub instance_id: i64,
    pub location_id: i64,
    pub location_name: String,
    pub quantity: i64,
}

/// Card listing entry
#[derive(Debug, Clone, Serialize)]
pub struct CardSummary {
    pub id: i64,
    pub scryfall_id: String,
    pub name: String,
    pub layout: String,
    pub lang: String,
    pub image_uri: Option<String>,
    pub cfl_image_uri: Option<String>,
    pub cfr_image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_quantity: i64,
    pub locations: Vec<LocationQuantity>,
}

pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<Card>> {
    let sql = format!("SELECT {} FROM cards WHERE id = ?", CARD_COLUMNS);
    let card = sqlx::query_as::<_, Card>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(card)
}

pub async fn find_by_scryfall_id<'e, E: SqliteExecutor<'e>>(
    ex: E,
    scryfall_id: &str,
) -> Result<Option<Card>> {
    let sql = format!("SELECT {} FROM cards WHERE scryfall_id = ?", CARD_COLUMNS);
    let card = sqlx::query_as::<_, Card>(&sql)
        .bind(scryfall_id)
        .fetch_optional(ex)
        .await?;
    Ok(card)
}

/// Insert a new card unless one with the same external id already exists
///
/// Returns true when a row was created.
pub async fn insert_card(
    conn: &mut SqliteConnection,
    scryfall_id: &str,
    card: &NormalizedCard,
    images: &ImagePaths,
    payload: &serde_json::Value,
) -> Result<bool> {
    let text = card.text.to_columns();
    let now = time::now();

    let result = sqlx::query(
        r#"
        INSERT INTO cards (
            scryfall_id, name, layout, lang,
            type_line, mana_cost, oracle_text,
            cfl_name, cfl_mana_cost, cfl_type_line, cfl_oracle_text,
            cfr_name, cfr_mana_cost, cfr_type_line, cfr_oracle_text,
            image_uri, cfl_image_uri, cfr_image_uri,
            scryfall_json, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(scryfall_id) DO NOTHING
        "#,
    )
    .bind(scryfall_id)
    .bind(&card.name)
    .bind(&card.layout)
    .bind(&card.lang)
    .bind(&text.type_line)
    .bind(&text.mana_cost)
    .bind(&text.oracle_text)
    .bind(&text.left.name)
    .bind(&text.left.mana_cost)
    .bind(&text.left.type_line)
    .bind(&text.left.oracle_text)
    .bind(&text.right.name)
    .bind(&text.right.mana_cost)
    .bind(&text.right.type_line)
    .bind(&text.right.oracle_text)
    .bind(&images.image_uri)
    .bind(&images.cfl_image_uri)
    .bind(&images.cfr_image_uri)
    .bind(Json(payload))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Overwrite the cached metadata of an existing card
pub async fn update_card(
    conn: &mut SqliteConnection,
    id: i64,
    card: &NormalizedCard,
    images: &ImagePaths,
    payload: &serde_json::Value,
) -> Result<()> {
    let text = card.text.to_columns();

    sqlx::query(
        r#"
        UPDATE cards SET
            name = ?, layout = ?, lang = ?,
            type_line = ?, mana_cost = ?, oracle_text = ?,
            cfl_name = ?, cfl_mana_cost = ?, cfl_type_line = ?, cfl_oracle_text = ?,
            cfr_name = ?, cfr_mana_cost = ?, cfr_type_line = ?, cfr_oracle_text = ?,
            image_uri = ?, cfl_image_uri = ?, cfr_image_uri = ?,
            scryfall_json = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&card.name)
    .bind(&card.layout)
    .bind(&card.lang)
    .bind(&text.type_line)
    .bind(&text.mana_cost)
    .bind(&text.oracle_text)
    .bind(&text.left.name)
    .bind(&text.left.mana_cost)
    .bind(&text.left.type_line)
    .bind(&text.left.oracle_text)
    .bind(&text.right.name)
    .bind(&text.right.mana_cost)
    .bind(&text.right.type_line)
    .bind(&text.right.oracle_text)
    .bind(&images.image_uri)
    .bind(&images.cfl_image_uri)
    .bind(&images.cfr_image_uri)
    .bind(Json(payload))
    .bind(time::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Bump the card's modification timestamp
pub async fn touch(conn: &mut SqliteConnection, scryfall_id: &str) -> Result<()> {
    sqlx::query("UPDATE cards SET updated_at = ? WHERE scryfall_id = ?")
        .bind(time::now())
        .bind(scryfall_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete a card together with all of its instance rows
///
/// Returns the number of instance rows removed.
pub async fn delete_card_and_instances(
    conn: &mut SqliteConnection,
    id: i64,
    scryfall_id: &str,
) -> Result<u64> {
    let instances = sqlx::query("DELETE FROM card_instances WHERE scryfall_id = ?")
        .bind(scryfall_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM cards WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(instances)
}

/// Instance rows of a card joined with their location names, sorted by name
pub async fn quantities_for_card<'e, E: SqliteExecutor<'e>>(
    ex: E,
    scryfall_id: &str,
) -> Result<Vec<LocationQuantity>> {
    let rows = sqlx::query_as::<_, LocationQuantity>(
        r#"
        SELECT ci.id AS instance_id, ci.location_id, l.name AS location_name, ci.quantity
        FROM card_instances ci
        JOIN locations l ON l.id = ci.location_id
        WHERE ci.scryfall_id = ?
        ORDER BY l.name
        "#,
    )
    .bind(scryfall_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

/// Cards with at least one copy anywhere, newest first
pub async fn list_in_stock(
    pool: &SqlitePool,
    requested_page: i64,
    per_page: i64,
) -> Result<Page<CardSummary>> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT c.id FROM cards c
            JOIN card_instances ci ON ci.scryfall_id = c.scryfall_id
            GROUP BY c.id
            HAVING SUM(ci.quantity) > 0
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    let pagination = calculate_pagination(total, requested_page, per_page);

    let rows = sqlx::query(
        r#"
        SELECT cards.*, totals.total_quantity
        FROM cards
        JOIN (
            SELECT scryfall_id, SUM(quantity) AS total_quantity
            FROM card_instances
            GROUP BY scryfall_id
            HAVING SUM(quantity) > 0
        ) totals ON totals.scryfall_id = cards.scryfall_id
        ORDER BY cards.created_at DESC, cards.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(pagination.per_page)
    .bind(pagination.offset)
    .fetch_all(pool)
    .await?;

    let mut cards = Vec::with_capacity(rows.len());
    for row in &rows {
        let card = Card::from_row(row)?;
        let total_quantity: i64 = row.try_get("total_quantity")?;
        cards.push((card, total_quantity));
    }

    let scryfall_ids: Vec<&str> = cards.iter().map(|(c, _)| c.scryfall_id.as_str()).collect();
    let mut by_card = quantities_for_cards(pool, &scryfall_ids).await?;

    let data = cards
        .into_iter()
        .map(|(card, total_quantity)| CardSummary {
            locations: by_card.remove(&card.scryfall_id).unwrap_or_default(),
            id: card.id,
            scryfall_id: card.scryfall_id,
            name: card.name,
            layout: card.layout,
            lang: card.lang,
            image_uri: card.image_uri,
            cfl_image_uri: card.cfl_image_uri,
            cfr_image_uri: card.cfr_image_uri,
            created_at: card.created_at,
            updated_at: card.updated_at,
            total_quantity,
        })
        .collect();

    Ok(Page { data, pagination })
}

async fn quantities_for_cards(
    pool: &SqlitePool,
    scryfall_ids: &[&str],
) -> Result<HashMap<String, Vec<LocationQuantity>>> {
    let mut map: HashMap<String, Vec<LocationQuantity>> = HashMap::new();
    if scryfall_ids.is_empty() {
        return Ok(map);
    }

    let placeholders = vec!["?"; scryfall_ids.len()].join(", ");
    let sql = format!(
        r#"
        SELECT ci.scryfall_id, ci.id AS instance_id, ci.location_id,
               l.name AS location_name, ci.quantity
        FROM card_instances ci
        JOIN locations l ON l.id = ci.location_id
        WHERE ci.scryfall_id IN ({})
        ORDER BY l.name
        "#,
        placeholders
    );

    let mut query = sqlx::query_as::<_, (String, i64, i64, String, i64)>(&sql);
    for id in scryfall_ids {
        query = query.bind(*id);
    }

    for (scryfall_id, instance_id, location_id, location_name, quantity) in
        query.fetch_all(pool).await?
    {
        map.entry(scryfall_id).or_default().push(LocationQuantity {
            instance_id,
            location_id,
            location_name,
            quantity,
        });
    }

    Ok(map)
}
