//! Image materializer
//!
//! Resolves the image URLs of a card payload, downloads each one once and
//! returns the relative storage paths. Download failures never escape this
//! module: the affected slot is simply left empty.

use crate::services::blob_store::BlobStore;
use crate::services::normalizer::CardPayload;
use crate::services::scryfall_client::CardSource;
use serde::Serialize;
use tracing::{info, warn};

const DEFAULT_EXTENSION: &str = "jpg";
const FRONT_FOLDER: &str = "front";
const BACK_FOLDER: &str = "back";

/// Stored image paths for the three card image slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImagePaths {
    pub image_uri: Option<String>,
    pub cfl_image_uri: Option<String>,
    pub cfr_image_uri: Option<String>,
}

impl ImagePaths {
    /// Slots in (primary, left, right) order
    pub fn slots(&self) -> [Option<&str>; 3] {
        [
            self.image_uri.as_deref(),
            self.cfl_image_uri.as_deref(),
            self.cfr_image_uri.as_deref(),
        ]
    }
}

/// Relative storage path for a downloaded image
///
/// `<folder>/<scryfall_id><suffix>.<ext>`, where the extension comes from the
/// URL path and defaults to "jpg".
pub fn storage_path(scryfall_id: &str, folder: &str, suffix: &str, url: &str) -> String {
    format!("{}/{}{}.{}", folder, scryfall_id, suffix, url_extension(url))
}

fn url_extension(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let file = parsed.path_segments()?.last()?.to_string();
            let (stem, ext) = file.rsplit_once('.')?;
            if stem.is_empty()
                || ext.is_empty()
                || ext.len() > 5
                || !ext.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return None;
            }
            Some(ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Downloads card images into the blob store
pub struct ImageMaterializer<'a> {
    source: &'a dyn CardSource,
    store: &'a BlobStore,
}

impl<'a> ImageMaterializer<'a> {
    pub fn new(source: &'a dyn CardSource, store: &'a BlobStore) -> Self {
        Self { source, store }
    }

    /// Download the images a payload exposes
    ///
    /// Both faces with a "normal" image → left/right slots, primary empty.
    /// Otherwise a top-level "normal" image → primary slot only.
    /// Otherwise nothing.
    pub async fn materialize(&self, payload: &CardPayload, scryfall_id: &str) -> ImagePaths {
        let faces = payload.faces().unwrap_or_default();
        let face_images = (
            faces.first().and_then(|f| f.normal_image()),
            faces.get(1).and_then(|f| f.normal_image()),
        );

        match (face_images, payload.normal_image()) {
            ((Some(left_url), Some(right_url)), _) => ImagePaths {
                image_uri: None,
                cfl_image_uri: self.download(left_url, scryfall_id, FRONT_FOLDER, "_face0").await,
                cfr_image_uri: self.download(right_url, scryfall_id, BACK_FOLDER, "_face1").await,
            },
            (_, Some(url)) => ImagePaths {
                image_uri: self.download(url, scryfall_id, FRONT_FOLDER, "").await,
                ..Default::default()
            },
            _ => ImagePaths::default(),
        }
    }

    async fn download(
        &self,
        url: &str,
        scryfall_id: &str,
        folder: &str,
        suffix: &str,
    ) -> Option<String> {
        let bytes = match self.source.fetch_asset(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, scryfall_id = %scryfall_id, error = %e, "Failed to download image");
                return None;
            }
        };

        let path = storage_path(scryfall_id, folder, suffix, url);
        match self.store.put(&path, &bytes).await {
            Ok(()) => {
                info!(scryfall_id = %scryfall_id, path = %path, "Stored card image");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to store image");
                None
            }
        }
    }
}
