//! Card repository
//!
//! Card records keyed by the external Scryfall id. Network work (payload
//! fetches, image downloads) always happens before a transaction opens; the
//! transaction itself only touches the database. Image files replaced or
//! removed by a write are staged in the blob store and only purged once the
//! row change has committed.

use crate::context::OpContext;
use crate::db::cards;
use crate::services::blob_store::{BlobStore, StagedDeletion};
use crate::services::image_materializer::{ImageMaterializer, ImagePaths};
use crate::services::normalizer::{normalize, CardPayload, NormalizedCard};
use crate::services::scryfall_client::SharedCardSource;
use cardvault_common::db::Card;
use cardvault_common::{Error, Result};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, instrument, warn};

/// A card that does not exist yet, with its images already downloaded
#[derive(Debug, Clone)]
pub struct NewCard {
    pub scryfall_id: String,
    pub card: NormalizedCard,
    pub images: ImagePaths,
    pub payload: serde_json::Value,
}

/// What an upsert will do once its transaction runs
#[derive(Debug, Clone)]
pub enum UpsertPlan {
    /// Known card; re-adding it never touches its metadata
    Existing(Card),
    New(NewCard),
}

impl UpsertPlan {
    pub fn scryfall_id(&self) -> &str {
        match self {
            UpsertPlan::Existing(card) => &card.scryfall_id,
            UpsertPlan::New(new) => &new.scryfall_id,
        }
    }
}

/// Result of a card deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedCard {
    pub scryfall_id: String,
    pub name: String,
    pub instances_removed: u64,
    pub images_removed: usize,
}

#[derive(Clone)]
pub struct CardRepository {
    pool: SqlitePool,
    store: BlobStore,
    source: SharedCardSource,
}

impl CardRepository {
    pub fn new(pool: SqlitePool, store: BlobStore, source: SharedCardSource) -> Self {
        Self {
            pool,
            store,
            source,
        }
    }

    pub async fn find_by_external_id(&self, scryfall_id: &str) -> Result<Card> {
        cards::find_by_scryfall_id(&self.pool, scryfall_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Card {} not found", scryfall_id)))
    }

    pub async fn find(&self, id: i64) -> Result<Card> {
        cards::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Card {} not found", id)))
    }

    /// Resolve a raw payload into an upsert plan
    ///
    /// Unknown cards are normalized and their images downloaded here.
    pub async fn plan_upsert(&self, raw: &serde_json::Value) -> Result<UpsertPlan> {
        let payload = CardPayload::from_value(raw)?;
        let scryfall_id = payload.require_id()?.to_string();

        if let Some(existing) = cards::find_by_scryfall_id(&self.pool, &scryfall_id).await? {
            info!(scryfall_id = %scryfall_id, "Card already exists");
            return Ok(UpsertPlan::Existing(existing));
        }

        let card = normalize(&payload, None);
        let images = ImageMaterializer::new(self.source.as_ref(), &self.store)
            .materialize(&payload, &scryfall_id)
            .await;

        Ok(UpsertPlan::New(NewCard {
            scryfall_id,
            card,
            images,
            payload: raw.clone(),
        }))
    }

    /// Write a plan inside the caller's transaction
    ///
    /// Returns true when a card row was created. A concurrent insert of the
    /// same id makes this a no-op.
    pub async fn apply_upsert(conn: &mut SqliteConnection, plan: &UpsertPlan) -> Result<bool> {
        match plan {
            UpsertPlan::Existing(_) => Ok(false),
            UpsertPlan::New(new) => {
                let created =
                    cards::insert_card(conn, &new.scryfall_id, &new.card, &new.images, &new.payload)
                        .await?;
                if created {
                    info!(scryfall_id = %new.scryfall_id, name = %new.card.name, "Created card");
                }
                Ok(created)
            }
        }
    }

    /// Create the card for a payload unless it already exists
    pub async fn upsert_from_payload(&self, raw: &serde_json::Value) -> Result<(Card, bool)> {
        let plan = self.plan_upsert(raw).await?;

        let mut tx = self.pool.begin().await?;
        let created = Self::apply_upsert(&mut *tx, &plan).await?;
        tx.commit().await?;

        let card = self.find_by_external_id(plan.scryfall_id()).await?;
        Ok((card, created))
    }

    /// Re-fetch a card from the data source and overwrite its cached metadata
    ///
    /// Nothing is persisted if the fetch fails. Old image files whose slot
    /// changed are removed only after the update commits.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, actor = %ctx.actor, card_id = id))]
    pub async fn refresh(&self, ctx: &OpContext, id: i64) -> Result<Card> {
        let card = self.find(id).await?;

        let raw = self.source.fetch_card(&card.scryfall_id).await.map_err(|e| {
            warn!(scryfall_id = %card.scryfall_id, error = %e, "Failed to fetch card data");
            Error::Upstream("Failed to fetch card data from Scryfall API".to_string())
        })?;
        let payload = CardPayload::from_value(&raw)
            .map_err(|e| Error::Upstream(format!("Scryfall returned unusable card data: {}", e)))?;

        let normalized = normalize(&payload, Some(&card));
        let images = ImageMaterializer::new(self.source.as_ref(), &self.store)
            .materialize(&payload, &card.scryfall_id)
            .await;

        let old_slots = card.image_paths();
        let new_slots = images.slots();
        let stale: Vec<&str> = old_slots
            .iter()
            .zip(new_slots.iter())
            .filter_map(|(old, new)| match old {
                Some(old) if Some(*old) != *new => Some(*old),
                _ => None,
            })
            // a stale path may still be in use by another slot
            .filter(|old| !new_slots.contains(&Some(*old)))
            .collect();

        let staged = self.stage_all(&stale).await?;

        let result = async {
            let mut tx = self.pool.begin().await?;
            cards::update_card(&mut *tx, card.id, &normalized, &images, &raw).await?;
            tx.commit().await?;
            Ok::<_, Error>(())
        }
        .await;

        if let Err(e) = result {
            error!(scryfall_id = %card.scryfall_id, error = %e, "Card refresh failed, rolling back");
            for staged in staged {
                staged.restore().await;
            }
            for path in new_slots.iter().flatten() {
                if !old_slots.contains(&Some(*path)) {
                    self.store.delete_best_effort(path).await;
                }
            }
            return Err(e);
        }

        for staged in staged {
            staged.finalize().await;
        }

        info!(
            scryfall_id = %card.scryfall_id,
            images_replaced = stale.len(),
            "Updated card data from Scryfall"
        );

        self.find(id).await
    }

    /// Delete a card, its instance rows and its stored images
    #[instrument(skip_all, fields(request_id = %ctx.request_id, actor = %ctx.actor, card_id = id))]
    pub async fn delete(&self, ctx: &OpContext, id: i64) -> Result<DeletedCard> {
        let card = self.find(id).await?;

        // missing or unmovable files never block the delete
        let mut staged = Vec::new();
        for path in card.image_paths().into_iter().flatten() {
            match self.store.stage_delete(path).await {
                Ok(Some(s)) => staged.push(s),
                Ok(None) => {}
                Err(e) => warn!(path = %path, error = %e, "Could not stage image for deletion"),
            }
        }

        let result = async {
            let mut tx = self.pool.begin().await?;
            let removed = cards::delete_card_and_instances(&mut *tx, card.id, &card.scryfall_id).await?;
            tx.commit().await?;
            Ok::<_, Error>(removed)
        }
        .await;

        let instances_removed = match result {
            Ok(removed) => removed,
            Err(e) => {
                error!(scryfall_id = %card.scryfall_id, error = %e, "Card delete failed, rolling back");
                for s in staged {
                    s.restore().await;
                }
                return Err(e);
            }
        };

        let images_removed = staged.len();
        for s in staged {
            s.finalize().await;
        }

        info!(
            scryfall_id = %card.scryfall_id,
            instances_removed,
            images_removed,
            "Deleted card"
        );

        Ok(DeletedCard {
            scryfall_id: card.scryfall_id,
            name: card.name,
            instances_removed,
            images_removed,
        })
    }

    /// Stage every path, undoing already-staged ones on failure
    async fn stage_all(&self, paths: &[&str]) -> Result<Vec<StagedDeletion>> {
        let mut staged = Vec::with_capacity(paths.len());
        for path in paths {
            match self.store.stage_delete(path).await {
                Ok(Some(s)) => staged.push(s),
                Ok(None) => {}
                Err(e) => {
                    for s in staged {
                        s.restore().await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(staged)
    }
}
