//! Inventory ledger
//!
//! Quantity counters per (card, location). Input is validated before a
//! transaction opens; each operation then runs as one transaction whose first
//! statement is a write, so concurrent operations on the same pair serialize
//! on SQLite's write lock. Instance rows are never deleted here.

use crate::context::OpContext;
use crate::db::{cards, ledger, locations};
use cardvault_common::db::{Card, Location};
use cardvault_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, instrument};

pub use crate::db::ledger::AddOutcome;

pub const SOURCE_SHORTFALL: &str = "Not enough cards at source location";
pub const LOCATION_SHORTFALL: &str = "Not enough cards at this location";

/// Quantities on both sides after a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub from_quantity: i64,
    pub to_quantity: i64,
    pub destination_created: bool,
}

#[derive(Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add copies of a card at a location
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn add(
        &self,
        ctx: &OpContext,
        card_id: i64,
        location_id: i64,
        qty: i64,
    ) -> Result<AddOutcome> {
        validate_quantity(qty)?;
        let card = self.card(card_id).await?;
        self.location(location_id, "location_id").await?;

        let mut tx = self.pool.begin().await?;
        let outcome = ledger::increment(&mut *tx, &card.scryfall_id, location_id, qty).await?;
        cards::touch(&mut *tx, &card.scryfall_id).await?;
        tx.commit().await?;

        info!(
            scryfall_id = %card.scryfall_id,
            location_id,
            quantity = outcome.quantity,
            created = outcome.created,
            "Added cards"
        );
        Ok(outcome)
    }

    /// Transfer copies between two locations; all or nothing
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn move_cards(
        &self,
        ctx: &OpContext,
        card_id: i64,
        from_location_id: i64,
        to_location_id: i64,
        qty: i64,
    ) -> Result<MoveOutcome> {
        validate_quantity(qty)?;
        if from_location_id == to_location_id {
            return Err(Error::validation(
                "to_location_id",
                "Destination must differ from source location",
            ));
        }
        let card = self.card(card_id).await?;
        self.location(from_location_id, "from_location_id").await?;
        self.location(to_location_id, "to_location_id").await?;

        // dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;
        let from_quantity = ledger::decrement(
            &mut *tx,
            &card.scryfall_id,
            from_location_id,
            qty,
            SOURCE_SHORTFALL,
        )
        .await?;
        let added = ledger::increment(&mut *tx, &card.scryfall_id, to_location_id, qty).await?;
        cards::touch(&mut *tx, &card.scryfall_id).await?;
        tx.commit().await?;

        info!(
            scryfall_id = %card.scryfall_id,
            from_location_id,
            to_location_id,
            quantity = qty,
            "Moved cards"
        );
        Ok(MoveOutcome {
            from_quantity,
            to_quantity: added.quantity,
            destination_created: added.created,
        })
    }

    /// Take copies out of a location; the row stays even at zero
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn remove(
        &self,
        ctx: &OpContext,
        card_id: i64,
        location_id: i64,
        qty: i64,
    ) -> Result<i64> {
        validate_quantity(qty)?;
        let card = self.card(card_id).await?;
        self.location(location_id, "location_id").await?;

        let mut tx = self.pool.begin().await?;
        let remaining =
            ledger::decrement(&mut *tx, &card.scryfall_id, location_id, qty, LOCATION_SHORTFALL)
                .await?;
        cards::touch(&mut *tx, &card.scryfall_id).await?;
        tx.commit().await?;

        info!(
            scryfall_id = %card.scryfall_id,
            location_id,
            removed = qty,
            remaining,
            "Removed cards"
        );
        Ok(remaining)
    }

    /// Current quantity of a card at a location, None if never tracked there
    pub async fn quantity(&self, scryfall_id: &str, location_id: i64) -> Result<Option<i64>> {
        ledger::quantity(&self.pool, scryfall_id, location_id).await
    }

    async fn card(&self, card_id: i64) -> Result<Card> {
        cards::find_by_id(&self.pool, card_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Card {} not found", card_id)))
    }

    async fn location(&self, location_id: i64, field: &str) -> Result<Location> {
        locations::find_by_id(&self.pool, location_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {} not found ({})", location_id, field)))
    }
}

/// Quantities must be at least one
pub fn validate_quantity(qty: i64) -> Result<()> {
    if qty < 1 {
        return Err(Error::validation("quantity", "Quantity must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(40).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(Error::Validation { ref field, .. }) if field == "quantity"
        ));
        assert!(validate_quantity(-3).is_err());
    }
}
