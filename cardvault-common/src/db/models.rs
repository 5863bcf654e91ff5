//! Database models
//!
//! Plain records, one per table. Relations are resolved by explicit queries
//! in the repository modules, never by traversing these structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;

/// Placeholder stored in `type_line` for multi-faced cards
pub const MULTI_FACE_TYPE_LINE: &str = "N/A";

/// Canonical card record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Card {
    pub id: i64,
    pub scryfall_id: String,
    pub name: String,
    pub layout: String,
    pub lang: String,

    pub type_line: Option<String>,
    pub mana_cost: Option<String>,
    pub oracle_text: Option<String>,

    pub cfl_name: Option<String>,
    pub cfl_mana_cost: Option<String>,
    pub cfl_type_line: Option<String>,
    pub cfl_oracle_text: Option<String>,

    pub cfr_name: Option<String>,
    pub cfr_mana_cost: Option<String>,
    pub cfr_type_line: Option<String>,
    pub cfr_oracle_text: Option<String>,

    pub image_uri: Option<String>,
    pub cfl_image_uri: Option<String>,
    pub cfr_image_uri: Option<String>,

    /// Verbatim external payload
    pub scryfall_json: Json<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// True when the row carries face-pair fields instead of single-face fields
    pub fn is_multi_faced(&self) -> bool {
        self.type_line.as_deref() == Some(MULTI_FACE_TYPE_LINE)
            || self.cfl_name.is_some()
            || self.cfr_name.is_some()
    }

    /// Stored image paths as (primary, left, right)
    pub fn image_paths(&self) -> [Option<&str>; 3] {
        [
            self.image_uri.as_deref(),
            self.cfl_image_uri.as_deref(),
            self.cfr_image_uri.as_deref(),
        ]
    }
}

/// Quantity of one card at one location
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardInstance {
    pub id: i64,
    pub scryfall_id: String,
    pub location_id: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named storage box, deck or side deck
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub location_type: String,
    pub deck_type: Option<String>,
    pub is_default: bool,
    pub commander: Option<String>,
    pub side_deck_parent: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Whether this location may parent a side deck
    pub fn is_eligible_parent(&self) -> bool {
        self.location_type == LocationType::Deck.as_str()
            && self
                .deck_type
                .as_deref()
                .and_then(|d| d.parse::<DeckType>().ok())
                .map(|d| d.can_parent_side_deck())
                .unwrap_or(false)
    }
}

/// External set metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MtgSet {
    pub id: i64,
    pub set_code: String,
    pub set_name: String,
    pub set_svg_url: Option<String>,
    pub set_release_date: Option<String>,
    pub set_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Location type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    Storage,
    Deck,
    #[serde(rename = "Side Deck")]
    SideDeck,
}

impl LocationType {
    pub const ALL: [LocationType; 3] = [LocationType::Storage, LocationType::Deck, LocationType::SideDeck];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Storage => "Storage",
            LocationType::Deck => "Deck",
            LocationType::SideDeck => "Side Deck",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LocationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown location type '{}'", s))
    }
}

/// Deck format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckType {
    Standard,
    Commander,
    Modern,
    Legacy,
    Casual,
}

impl DeckType {
    pub const ALL: [DeckType; 5] = [
        DeckType::Standard,
        DeckType::Commander,
        DeckType::Modern,
        DeckType::Legacy,
        DeckType::Casual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeckType::Standard => "Standard",
            DeckType::Commander => "Commander",
            DeckType::Modern => "Modern",
            DeckType::Legacy => "Legacy",
            DeckType::Casual => "Casual",
        }
    }

    /// Only Commander and Standard decks can own side decks
    pub fn can_parent_side_deck(&self) -> bool {
        matches!(self, DeckType::Commander | DeckType::Standard)
    }
}

impl fmt::Display for DeckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeckType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeckType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown deck type '{}'", s))
    }
}
