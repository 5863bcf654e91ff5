//! Card normalizer
//!
//! Turns a raw Scryfall card payload into the flat card schema. Only the
//! fields listed in [`CardPayload`] are interpreted; the full payload is
//! stored verbatim alongside the normalized record.

use cardvault_common::db::{Card, MULTI_FACE_TYPE_LINE};
use cardvault_common::{Error, Result};
use serde::Deserialize;

const DEFAULT_LAYOUT: &str = "normal";
const DEFAULT_LANG: &str = "en";

/// `image_uris` object; only the "normal" resolution is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUris {
    #[serde(default)]
    pub normal: Option<String>,
}

/// One entry of `card_faces`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

/// Partial schema of an external card payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub card_faces: Option<Vec<FacePayload>>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl CardPayload {
    /// Interpret a raw JSON payload
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::validation("scryfall_data", "card payload must be a JSON object"));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| Error::validation("scryfall_data", format!("malformed card payload: {}", e)))
    }

    /// External identifier; missing or blank ids are a validation failure
    pub fn require_id(&self) -> Result<&str> {
        match self.id.as_deref().map(str::trim) {
            Some(id) if id.is_empty() => Err(Error::validation(
                "scryfall_data.id",
                "Invalid card data: missing Scryfall ID",
            )),
            // the id ends up in URLs and file names
            Some(id)
                if !id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
            {
                Err(Error::validation(
                    "scryfall_data.id",
                    "Invalid card data: malformed Scryfall ID",
                ))
            }
            Some(id) => Ok(id),
            None => Err(Error::validation(
                "scryfall_data.id",
                "Invalid card data: missing Scryfall ID",
            )),
        }
    }

    /// Non-empty `card_faces`, if any
    pub fn faces(&self) -> Option<&[FacePayload]> {
        self.card_faces.as_deref().filter(|faces| !faces.is_empty())
    }

    pub fn normal_image(&self) -> Option<&str> {
        self.image_uris.as_ref().and_then(|u| u.normal.as_deref())
    }
}

impl FacePayload {
    pub fn normal_image(&self) -> Option<&str> {
        self.image_uris.as_ref().and_then(|u| u.normal.as_deref())
    }
}

/// Text block of one card face
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceFields {
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub type_line: Option<String>,
    pub oracle_text: Option<String>,
}

impl From<&FacePayload> for FaceFields {
    fn from(face: &FacePayload) -> Self {
        Self {
            name: face.name.clone(),
            mana_cost: face.mana_cost.clone(),
            type_line: face.type_line.clone(),
            oracle_text: face.oracle_text.clone(),
        }
    }
}

/// Either single-face text or a left/right face pair, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardText {
    Single {
        type_line: Option<String>,
        mana_cost: Option<String>,
        oracle_text: Option<String>,
    },
    Faces {
        left: FaceFields,
        right: FaceFields,
    },
}

/// Column values for the eleven text columns of the cards table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextColumns {
    pub type_line: Option<String>,
    pub mana_cost: Option<String>,
    pub oracle_text: Option<String>,
    pub left: FaceFields,
    pub right: FaceFields,
}

impl CardText {
    pub fn to_columns(&self) -> TextColumns {
        match self {
            CardText::Single {
                type_line,
                mana_cost,
                oracle_text,
            } => TextColumns {
                type_line: type_line.clone(),
                mana_cost: mana_cost.clone(),
                oracle_text: oracle_text.clone(),
                left: FaceFields::default(),
                right: FaceFields::default(),
            },
            CardText::Faces { left, right } => TextColumns {
                type_line: Some(MULTI_FACE_TYPE_LINE.to_string()),
                mana_cost: None,
                oracle_text: None,
                left: left.clone(),
                right: right.clone(),
            },
        }
    }
}

/// Canonical card fields produced from a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCard {
    pub name: String,
    pub layout: String,
    pub lang: String,
    pub text: CardText,
}

/// Normalize a payload, optionally on top of an existing record
///
/// When `existing` is given (refresh), absent top-level fields keep the stored
/// values. Single-face text only falls back to stored values if the stored
/// card was itself single-faced.
pub fn normalize(payload: &CardPayload, existing: Option<&Card>) -> NormalizedCard {
    let name = payload
        .name
        .clone()
        .or_else(|| existing.map(|c| c.name.clone()))
        .unwrap_or_default();
    let layout = payload
        .layout
        .clone()
        .or_else(|| existing.map(|c| c.layout.clone()))
        .unwrap_or_else(|| DEFAULT_LAYOUT.to_string());
    let lang = payload
        .lang
        .clone()
        .or_else(|| existing.map(|c| c.lang.clone()))
        .unwrap_or_else(|| DEFAULT_LANG.to_string());

    let text = match payload.faces() {
        None => {
            let previous = existing.filter(|c| !c.is_multi_faced());
            CardText::Single {
                type_line: payload
                    .type_line
                    .clone()
                    .or_else(|| previous.and_then(|c| c.type_line.clone())),
                mana_cost: payload
                    .mana_cost
                    .clone()
                    .or_else(|| previous.and_then(|c| c.mana_cost.clone())),
                oracle_text: payload
                    .oracle_text
                    .clone()
                    .or_else(|| previous.and_then(|c| c.oracle_text.clone())),
            }
        }
        Some(faces) => CardText::Faces {
            left: faces.first().map(FaceFields::from).unwrap_or_default(),
            // faces beyond index 1 are ignored
            right: faces.get(1).map(FaceFields::from).unwrap_or_default(),
        },
    };

    NormalizedCard {
        name,
        layout,
        lang,
        text,
    }
}
