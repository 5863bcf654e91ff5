//! Set catalog sync
//!
//! Imports sets the local catalog does not know yet. Known codes are skipped,
//! never refreshed. Only the list fetch is all-or-nothing; every other
//! failure is recorded per set and the import carries on.

use crate::context::OpContext;
use crate::db::sets::{self, NewSet};
use crate::services::blob_store::BlobStore;
use crate::services::scryfall_client::SharedCardSource;
use cardvault_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, instrument, warn};

const SETS_FOLDER: &str = "sets";

/// Operator-facing result of a sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub imported: usize,
    pub errors: Vec<String>,
    pub log: Vec<String>,
}

impl SyncReport {
    fn failed(message: &str, error: String) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            imported: 0,
            errors: vec![error],
            log: vec![message.to_string()],
        }
    }
}

fn str_field<'a>(entry: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn icon_path(code: &str) -> String {
    format!("{}/{}.svg", SETS_FOLDER, code)
}

#[derive(Clone)]
pub struct SetCatalogSync {
    pool: SqlitePool,
    store: BlobStore,
    source: SharedCardSource,
}

impl SetCatalogSync {
    pub fn new(pool: SqlitePool, store: BlobStore, source: SharedCardSource) -> Self {
        Self {
            pool,
            store,
            source,
        }
    }

    /// Fetch the full set list and insert the sets not seen before
    #[instrument(skip_all, fields(request_id = %ctx.request_id, actor = %ctx.actor))]
    pub async fn sync_sets(&self, ctx: &OpContext) -> Result<SyncReport> {
        let entries = match self.source.fetch_sets().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Set list fetch failed");
                return Ok(SyncReport::failed(
                    "Failed to fetch sets from Scryfall API",
                    format!("API request failed: {}", e),
                ));
            }
        };

        let mut known = sets::existing_codes(&self.pool).await?;
        let mut report = SyncReport {
            success: true,
            ..Default::default()
        };

        report
            .log
            .push(format!("Fetched {} sets from Scryfall API", entries.len()));
        report
            .log
            .push(format!("Found {} existing sets in database", known.len()));

        for entry in &entries {
            let (Some(code), Some(name)) = (str_field(entry, "code"), str_field(entry, "name"))
            else {
                continue;
            };
            if known.contains(code) {
                continue;
            }

            let set_type = str_field(entry, "set_type");
            let svg_path = match str_field(entry, "icon_svg_uri") {
                Some(url) => self.download_icon(code, url, &mut report.errors).await,
                None => None,
            };

            let new_set = NewSet {
                code,
                name,
                svg_path: svg_path.as_deref(),
                release_date: str_field(entry, "released_at"),
                set_type,
            };

            match sets::insert_set(&self.pool, &new_set).await {
                Ok(true) => {
                    known.insert(code.to_string());
                    report.imported += 1;
                    report.log.push(match set_type {
                        Some(t) => format!("✓ Added: [{}] {} ({})", code, name, t),
                        None => format!("✓ Added: [{}] {}", code, name),
                    });
                    info!(set_code = %code, set_name = %name, "Imported set");
                }
                // lost a race with a concurrent sync; first import wins
                Ok(false) => {
                    known.insert(code.to_string());
                }
                Err(e) => {
                    error!(set_code = %code, error = %e, "Failed to insert set");
                    report
                        .errors
                        .push(format!("Error processing set {}: {}", code, e));
                }
            }
        }

        report.log.push("---".to_string());
        report.log.push(format!(
            "Import completed: {} new sets added to database",
            report.imported
        ));
        if !report.errors.is_empty() {
            report.log.push(format!(
                "Encountered {} errors during import",
                report.errors.len()
            ));
        }
        report.message = format!("Successfully imported {} new sets", report.imported);

        info!(
            imported = report.imported,
            errors = report.errors.len(),
            "Set sync finished"
        );
        Ok(report)
    }

    async fn download_icon(&self, code: &str, url: &str, errors: &mut Vec<String>) -> Option<String> {
        let bytes = match self.source.fetch_asset(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(set_code = %code, url = %url, error = %e, "Failed to download set icon");
                errors.push(format!("Failed to download SVG for {}: {}", code, e));
                return None;
            }
        };

        let path = icon_path(code);
        match self.store.put(&path, &bytes).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(set_code = %code, error = %e, "Failed to store set icon");
                errors.push(format!("Failed to download SVG for {}: {}", code, e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_icon_path() {
        assert_eq!(icon_path("lea"), "sets/lea.svg");
    }

    #[test]
    fn test_str_field_ignores_blank_and_non_strings() {
        let entry = json!({"code": "lea", "name": "  ", "set_type": 3});
        assert_eq!(str_field(&entry, "code"), Some("lea"));
        assert_eq!(str_field(&entry, "name"), None);
        assert_eq!(str_field(&entry, "set_type"), None);
        assert_eq!(str_field(&entry, "missing"), None);
    }
}
