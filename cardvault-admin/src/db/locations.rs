//! Location database operations

use cardvault_common::db::Location;
use cardvault_common::Result;
use cardvault_common::time;
use serde::Serialize;
use sqlx::{SqliteConnection, SqliteExecutor};

const LOCATION_COLUMNS: &str = "id, name, location_type, deck_type, is_default, commander, \
     side_deck_parent, created_at, updated_at";

/// Writable location fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationFields {
    pub name: String,
    pub location_type: String,
    pub deck_type: Option<String>,
    pub is_default: bool,
    pub commander: Option<String>,
    pub side_deck_parent: Option<i64>,
}

/// Location listing entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LocationSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub location: Location,
    pub card_count: i64,
    pub parent_name: Option<String>,
}

/// Card held at a location
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LocationCard {
    pub instance_id: i64,
    pub card_id: i64,
    pub scryfall_id: String,
    pub name: String,
    pub image_uri: Option<String>,
    pub cfl_image_uri: Option<String>,
    pub quantity: i64,
}

/// Take the database write lock inside a transaction before any read
pub async fn lock_for_write(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("UPDATE locations SET is_default = is_default WHERE 0")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<Option<Location>> {
    let sql = format!("SELECT {} FROM locations WHERE id = ?", LOCATION_COLUMNS);
    let location = sqlx::query_as::<_, Location>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(location)
}

/// Case-sensitive lookup by unique name
pub async fn find_by_name<'e, E: SqliteExecutor<'e>>(
    ex: E,
    name: &str,
) -> Result<Option<Location>> {
    let sql = format!("SELECT {} FROM locations WHERE name = ?", LOCATION_COLUMNS);
    let location = sqlx::query_as::<_, Location>(&sql)
        .bind(name)
        .fetch_optional(ex)
        .await?;
    Ok(location)
}

pub async fn find_default<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Option<Location>> {
    let sql = format!(
        "SELECT {} FROM locations WHERE is_default = 1 LIMIT 1",
        LOCATION_COLUMNS
    );
    let location = sqlx::query_as::<_, Location>(&sql)
        .fetch_optional(ex)
        .await?;
    Ok(location)
}

/// All locations, newest first, with summed card counts and parent names
pub async fn list_with_counts<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<LocationSummary>> {
    let rows = sqlx::query_as::<_, LocationSummary>(
        r#"
        SELECT l.id, l.name, l.location_type, l.deck_type, l.is_default, l.commander,
               l.side_deck_parent, l.created_at, l.updated_at,
               COALESCE((SELECT SUM(ci.quantity) FROM card_instances ci
                         WHERE ci.location_id = l.id), 0) AS card_count,
               p.name AS parent_name
        FROM locations l
        LEFT JOIN locations p ON p.id = l.side_deck_parent
        ORDER BY l.created_at DESC, l.id DESC
        "#,
    )
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

/// Decks that may own a side deck, sorted by name
pub async fn eligible_parents<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Vec<Location>> {
    let sql = format!(
        "SELECT {} FROM locations \
         WHERE location_type = 'Deck' AND deck_type IN ('Commander', 'Standard') \
         ORDER BY name",
        LOCATION_COLUMNS
    );
    let rows = sqlx::query_as::<_, Location>(&sql).fetch_all(ex).await?;
    Ok(rows)
}

/// Cards with an instance row at a location, sorted by card name
pub async fn cards_at<'e, E: SqliteExecutor<'e>>(
    ex: E,
    location_id: i64,
) -> Result<Vec<LocationCard>> {
    let rows = sqlx::query_as::<_, LocationCard>(
        r#"
        SELECT ci.id AS instance_id, c.id AS card_id, c.scryfall_id, c.name,
               c.image_uri, c.cfl_image_uri, ci.quantity
        FROM card_instances ci
        JOIN cards c ON c.scryfall_id = ci.scryfall_id
        WHERE ci.location_id = ?
        ORDER BY c.name
        "#,
    )
    .bind(location_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn insert_location(conn: &mut SqliteConnection, fields: &LocationFields) -> Result<i64> {
    let now = time::now();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO locations (
            name, location_type, deck_type, is_default, commander, side_deck_parent,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.location_type)
    .bind(&fields.deck_type)
    .bind(fields.is_default)
    .bind(&fields.commander)
    .bind(fields.side_deck_parent)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Returns false when no row matched
pub async fn update_location(
    conn: &mut SqliteConnection,
    id: i64,
    fields: &LocationFields,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE locations SET
            name = ?, location_type = ?, deck_type = ?, is_default = ?,
            commander = ?, side_deck_parent = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.location_type)
    .bind(&fields.deck_type)
    .bind(fields.is_default)
    .bind(&fields.commander)
    .bind(fields.side_deck_parent)
    .bind(time::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Clear the default flag on every location except `keep`
pub async fn clear_default(conn: &mut SqliteConnection, keep: Option<i64>) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE locations SET is_default = 0, updated_at = ? \
         WHERE is_default = 1 AND (? IS NULL OR id != ?)",
    )
    .bind(time::now())
    .bind(keep)
    .bind(keep)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn set_default(conn: &mut SqliteConnection, id: i64) -> Result<()> {
    sqlx::query("UPDATE locations SET is_default = 1, updated_at = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete a location; instance rows cascade, child side decks lose their parent
///
/// Returns whether the deleted row was the default.
pub async fn delete_location(conn: &mut SqliteConnection, id: i64) -> Result<Option<bool>> {
    let was_default: Option<bool> =
        sqlx::query_scalar("DELETE FROM locations WHERE id = ? RETURNING is_default")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(was_default)
}

/// Oldest remaining location, used when the default has to move
pub async fn first_location_id<'e, E: SqliteExecutor<'e>>(ex: E) -> Result<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM locations ORDER BY id LIMIT 1")
        .fetch_optional(ex)
        .await?;
    Ok(id)
}

/// Number of side decks pointing at `id`
pub async fn count_children<'e, E: SqliteExecutor<'e>>(ex: E, id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE side_deck_parent = ?")
        .bind(id)
        .fetch_one(ex)
        .await?;
    Ok(count)
}
