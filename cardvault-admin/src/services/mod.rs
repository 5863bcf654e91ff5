//! Core card inventory workflow
//!
//! Leaves first: normalizer and image materializer, then the repository,
//! ledger, ingestion, set sync and location registry built on top of them.

pub mod blob_store;
pub mod card_repository;
pub mod image_materializer;
pub mod ingest;
pub mod ledger;
pub mod locations;
pub mod normalizer;
pub mod scryfall_client;
pub mod set_sync;

pub use blob_store::{BlobStore, StagedDeletion, PUBLIC_FOLDERS};
pub use card_repository::{CardRepository, DeletedCard, UpsertPlan};
pub use image_materializer::{ImageMaterializer, ImagePaths};
pub use ingest::{CardIngest, IngestOutcome};
pub use ledger::{InventoryLedger, MoveOutcome};
pub use locations::{LocationInput, LocationRegistry};
pub use normalizer::{normalize, CardPayload, NormalizedCard};
pub use scryfall_client::{CardSource, ScryfallClient, SharedCardSource, SourceError};
pub use set_sync::{SetCatalogSync, SyncReport};
