//! Card ingestion
//!
//! payload → normalize → download images → create-or-reuse card →
//! increment the instance at the target location.

use crate::context::OpContext;
use crate::db::{cards, ledger, locations};
use crate::services::card_repository::CardRepository;
use crate::services::ledger::validate_quantity;
use cardvault_common::db::Location;
use cardvault_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, instrument};

/// Outcome of adding a card to the library
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub card_id: i64,
    pub scryfall_id: String,
    pub location_id: i64,
    pub quantity: i64,
    pub card_created: bool,
    pub instance_created: bool,
    /// Carried by the response envelope
    #[serde(skip_serializing)]
    pub message: String,
}

#[derive(Clone)]
pub struct CardIngest {
    pool: SqlitePool,
    repository: CardRepository,
}

impl CardIngest {
    pub fn new(pool: SqlitePool, repository: CardRepository) -> Self {
        Self { pool, repository }
    }

    /// Add `qty` copies of the card described by `raw`
    ///
    /// Without an explicit location the current default location is used.
    #[instrument(skip(self, ctx, raw), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn add_card(
        &self,
        ctx: &OpContext,
        raw: &serde_json::Value,
        location_id: Option<i64>,
        qty: i64,
    ) -> Result<IngestOutcome> {
        validate_quantity(qty)?;
        let location = self.target_location(location_id).await?;

        let plan = self.repository.plan_upsert(raw).await?;
        let scryfall_id = plan.scryfall_id().to_string();

        let mut tx = self.pool.begin().await?;
        let card_created = CardRepository::apply_upsert(&mut *tx, &plan).await?;
        let added = ledger::increment(&mut *tx, &scryfall_id, location.id, qty).await?;
        cards::touch(&mut *tx, &scryfall_id).await?;
        let card = cards::find_by_scryfall_id(&mut *tx, &scryfall_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("Card {} vanished during ingest", scryfall_id)))?;
        tx.commit().await?;

        let message = if added.created {
            info!(scryfall_id = %scryfall_id, location_id = location.id, "Created new card instance");
            "Card added to library successfully".to_string()
        } else {
            info!(
                scryfall_id = %scryfall_id,
                location_id = location.id,
                quantity = added.quantity,
                "Incremented card instance quantity"
            );
            format!(
                "Card quantity updated to {} at the selected location",
                added.quantity
            )
        };

        Ok(IngestOutcome {
            card_id: card.id,
            scryfall_id,
            location_id: location.id,
            quantity: added.quantity,
            card_created,
            instance_created: added.created,
            message,
        })
    }

    async fn target_location(&self, location_id: Option<i64>) -> Result<Location> {
        match location_id {
            Some(id) => locations::find_by_id(&self.pool, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Location {} not found (location_id)", id))),
            None => locations::find_default(&self.pool).await?.ok_or_else(|| {
                Error::validation(
                    "location_id",
                    "No location given and no default location is set",
                )
            }),
        }
    }
}
