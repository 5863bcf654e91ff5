//! Card instance quantity queries
//!
//! Each mutating function opens with a write statement so that, inside a
//! transaction, SQLite takes the write lock before anything is read.

use cardvault_common::{Error, Result};
use cardvault_common::time;
use sqlx::{SqliteConnection, SqliteExecutor};

/// Result of an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Quantity after the increment
    pub quantity: i64,
    /// True when the instance row did not exist before
    pub created: bool,
}

/// Add `qty` copies at a location, creating the instance row if needed
pub async fn increment(
    conn: &mut SqliteConnection,
    scryfall_id: &str,
    location_id: i64,
    qty: i64,
) -> Result<AddOutcome> {
    let now = time::now();

    let created = sqlx::query(
        r#"
        INSERT INTO card_instances (scryfall_id, location_id, quantity, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(scryfall_id, location_id) DO NOTHING
        "#,
    )
    .bind(scryfall_id)
    .bind(location_id)
    .bind(qty)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected()
        == 1;

    if created {
        return Ok(AddOutcome {
            quantity: qty,
            created,
        });
    }

    let quantity: i64 = sqlx::query_scalar(
        r#"
        UPDATE card_instances
        SET quantity = quantity + ?, updated_at = ?
        WHERE scryfall_id = ? AND location_id = ?
        RETURNING quantity
        "#,
    )
    .bind(qty)
    .bind(now)
    .bind(scryfall_id)
    .bind(location_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(AddOutcome { quantity, created })
}

/// Take `qty` copies from a location
///
/// The row is kept even when it drops to zero. Returns the new quantity.
pub async fn decrement(
    conn: &mut SqliteConnection,
    scryfall_id: &str,
    location_id: i64,
    qty: i64,
    shortfall_message: &str,
) -> Result<i64> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE card_instances
        SET quantity = quantity - ?, updated_at = ?
        WHERE scryfall_id = ? AND location_id = ? AND quantity >= ?
        RETURNING quantity
        "#,
    )
    .bind(qty)
    .bind(time::now())
    .bind(scryfall_id)
    .bind(location_id)
    .bind(qty)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(remaining) = remaining {
        return Ok(remaining);
    }

    match quantity(&mut *conn, scryfall_id, location_id).await? {
        Some(_) => Err(Error::InsufficientQuantity(shortfall_message.to_string())),
        None => Err(Error::NotFound(format!(
            "Card {} has no copies at location {}",
            scryfall_id, location_id
        ))),
    }
}

/// Current quantity, or None when no instance row exists
pub async fn quantity<'e, E: SqliteExecutor<'e>>(
    ex: E,
    scryfall_id: &str,
    location_id: i64,
) -> Result<Option<i64>> {
    let qty = sqlx::query_scalar(
        "SELECT quantity FROM card_instances WHERE scryfall_id = ? AND location_id = ?",
    )
    .bind(scryfall_id)
    .bind(location_id)
    .fetch_optional(ex)
    .await?;
    Ok(qty)
}

