//! Location registry
//!
//! CRUD over storage boxes, decks and side decks. Every write goes through
//! [`validate_location`] inside its transaction, and the default flag is
//! moved, never duplicated.

use crate::context::OpContext;
use crate::db::locations::{self, LocationCard, LocationFields, LocationSummary};
use cardvault_common::db::{DeckType, Location, LocationType};
use cardvault_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument};

const MAX_TEXT_LEN: usize = 255;

/// Location create/update request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location_type: String,
    #[serde(default)]
    pub deck_type: Option<String>,
    #[serde(default)]
    pub commander: Option<String>,
    #[serde(default)]
    pub side_deck_parent: Option<i64>,
    #[serde(default)]
    pub is_default: bool,
}

/// Entry of the eligible-parents listing
#[derive(Debug, Clone, Serialize)]
pub struct ParentOption {
    pub id: i64,
    pub name: String,
    pub deck_type: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationDetail {
    #[serde(flatten)]
    pub location: Location,
    pub parent_name: Option<String>,
    pub cards: Vec<LocationCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedLocation {
    pub id: i64,
    pub name: String,
    /// Location that inherited the default flag, if any
    pub new_default: Option<i64>,
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Shape checks that need no database access
fn check_fields(input: &LocationInput) -> Result<(LocationFields, LocationType)> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("name", "The name field is required."));
    }
    if name.chars().count() > MAX_TEXT_LEN {
        return Err(Error::validation(
            "name",
            format!("The name may not be greater than {} characters.", MAX_TEXT_LEN),
        ));
    }

    let location_type: LocationType = input
        .location_type
        .trim()
        .parse()
        .map_err(|e: String| Error::validation("location_type", e))?;

    let deck_type = blank_to_none(&input.deck_type)
        .map(|d| d.parse::<DeckType>())
        .transpose()
        .map_err(|e| Error::validation("deck_type", e))?;

    let commander = blank_to_none(&input.commander);
    if let Some(commander) = &commander {
        if commander.chars().count() > MAX_TEXT_LEN {
            return Err(Error::validation(
                "commander",
                format!("The commander may not be greater than {} characters.", MAX_TEXT_LEN),
            ));
        }
        if location_type != LocationType::Deck {
            return Err(Error::validation(
                "commander",
                "Only decks can have a commander.",
            ));
        }
    }

    if input.side_deck_parent.is_some() && location_type != LocationType::SideDeck {
        return Err(Error::validation(
            "side_deck_parent",
            "Only side decks can have a parent deck.",
        ));
    }

    let fields = LocationFields {
        name,
        location_type: location_type.as_str().to_string(),
        deck_type: deck_type.map(|d| d.as_str().to_string()),
        is_default: input.is_default,
        commander,
        side_deck_parent: input.side_deck_parent,
    };
    Ok((fields, location_type))
}

fn is_eligible(location_type: LocationType, deck_type: Option<&str>) -> bool {
    location_type == LocationType::Deck
        && deck_type
            .and_then(|d| d.parse::<DeckType>().ok())
            .map(|d| d.can_parent_side_deck())
            .unwrap_or(false)
}

/// Validate a location write against the stored data
///
/// `id` is the location being updated, None on create.
pub async fn validate_location(
    conn: &mut SqliteConnection,
    input: &LocationInput,
    id: Option<i64>,
) -> Result<LocationFields> {
    let (fields, location_type) = check_fields(input)?;

    if let Some(other) = locations::find_by_name(&mut *conn, &fields.name).await? {
        if Some(other.id) != id {
            return Err(Error::validation("name", "The name has already been taken."));
        }
    }

    if let Some(parent_id) = fields.side_deck_parent {
        if Some(parent_id) == id {
            return Err(Error::validation(
                "side_deck_parent",
                "A side deck cannot be its own parent.",
            ));
        }
        let parent = locations::find_by_id(&mut *conn, parent_id)
            .await?
            .ok_or_else(|| {
                Error::validation("side_deck_parent", "The selected parent deck does not exist.")
            })?;
        if !parent.is_eligible_parent() {
            return Err(Error::validation(
                "side_deck_parent",
                "The parent must be a Commander or Standard deck.",
            ));
        }
    }

    if let Some(id) = id {
        if !is_eligible(location_type, fields.deck_type.as_deref())
            && locations::count_children(&mut *conn, id).await? > 0
        {
            return Err(Error::validation(
                "deck_type",
                "This location parents side decks and must stay a Commander or Standard deck.",
            ));
        }
    }

    Ok(fields)
}

#[derive(Clone)]
pub struct LocationRegistry {
    pool: SqlitePool,
}

impl LocationRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<LocationSummary>> {
        locations::list_with_counts(&self.pool).await
    }

    pub async fn eligible_parents(&self) -> Result<Vec<ParentOption>> {
        let parents = locations::eligible_parents(&self.pool).await?;
        Ok(parents
            .into_iter()
            .map(|l| ParentOption {
                label: format!("{} ({})", l.name, l.deck_type.as_deref().unwrap_or_default()),
                id: l.id,
                name: l.name,
                deck_type: l.deck_type,
            })
            .collect())
    }

    pub async fn find(&self, id: i64) -> Result<Location> {
        locations::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {} not found", id)))
    }

    pub async fn default_location(&self) -> Result<Option<Location>> {
        locations::find_default(&self.pool).await
    }

    /// Location with its parent's name and the cards it holds
    pub async fn detail(&self, id: i64) -> Result<LocationDetail> {
        let location = self.find(id).await?;
        let parent_name = match location.side_deck_parent {
            Some(parent) => locations::find_by_id(&self.pool, parent).await?.map(|p| p.name),
            None => None,
        };
        let cards = locations::cards_at(&self.pool, id).await?;
        Ok(LocationDetail {
            location,
            parent_name,
            cards,
        })
    }

    #[instrument(skip(self, ctx, input), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn create(&self, ctx: &OpContext, input: &LocationInput) -> Result<Location> {
        check_fields(input)?;

        let mut tx = self.pool.begin().await?;
        locations::lock_for_write(&mut *tx).await?;
        let fields = validate_location(&mut *tx, input, None).await?;
        if fields.is_default {
            locations::clear_default(&mut *tx, None).await?;
        }
        let id = locations::insert_location(&mut *tx, &fields).await?;
        tx.commit().await?;

        info!(location_id = id, name = %fields.name, is_default = fields.is_default, "Created location");
        self.find(id).await
    }

    #[instrument(skip(self, ctx, input), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn update(&self, ctx: &OpContext, id: i64, input: &LocationInput) -> Result<Location> {
        check_fields(input)?;
        self.find(id).await?;

        let mut tx = self.pool.begin().await?;
        locations::lock_for_write(&mut *tx).await?;
        let fields = validate_location(&mut *tx, input, Some(id)).await?;
        if fields.is_default {
            locations::clear_default(&mut *tx, Some(id)).await?;
        }
        if !locations::update_location(&mut *tx, id, &fields).await? {
            return Err(Error::NotFound(format!("Location {} not found", id)));
        }
        tx.commit().await?;

        info!(location_id = id, name = %fields.name, is_default = fields.is_default, "Updated location");
        self.find(id).await
    }

    /// Delete a location; its instance rows go with it
    ///
    /// Deleting the default promotes the oldest remaining location.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn delete(&self, ctx: &OpContext, id: i64) -> Result<DeletedLocation> {
        let location = self.find(id).await?;

        let mut tx = self.pool.begin().await?;
        let was_default = locations::delete_location(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Location {} not found", id)))?;

        let mut new_default = None;
        if was_default {
            if let Some(next) = locations::first_location_id(&mut *tx).await? {
                locations::set_default(&mut *tx, next).await?;
                new_default = Some(next);
            }
        }
        tx.commit().await?;

        info!(location_id = id, name = %location.name, ?new_default, "Deleted location");
        Ok(DeletedLocation {
            id,
            name: location.name,
            new_default,
        })
    }
}
