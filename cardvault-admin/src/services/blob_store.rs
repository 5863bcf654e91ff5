//! Blob storage for card images and set icons
//!
//! Paths handed out and accepted by this module are relative to the storage
//! root (`front/<id>.jpg`, `back/<id>_face1.jpg`, `sets/<code>.svg`).

use cardvault_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const TRASH_DIR: &str = ".trash";
const TMP_DIR: &str = ".tmp";

/// Folders holding publicly served blobs
pub const PUBLIC_FOLDERS: [&str; 3] = ["front", "back", "sets"];

/// Filesystem-backed blob store
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative blob path to an absolute one
    ///
    /// Rejects empty, absolute and parent-escaping paths.
    pub fn absolute(&self, rel: &str) -> Result<PathBuf> {
        let rel_path = Path::new(rel);
        if rel.is_empty()
            || !rel_path
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::InvalidInput(format!("invalid storage path: {}", rel)));
        }
        Ok(self.root.join(rel_path))
    }

    /// Write bytes at `rel`, replacing any existing file
    pub async fn put(&self, rel: &str, bytes: &[u8]) -> Result<()> {
        let path = self.absolute(rel)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // partial writes live outside the public folders until complete
        let tmp = self.root.join(TMP_DIR);
        tokio::fs::create_dir_all(&tmp).await?;
        let partial = tmp.join(format!("{}.part", Uuid::new_v4()));
        tokio::fs::write(&partial, bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        debug!(path = %rel, size = bytes.len(), "Stored blob");
        Ok(())
    }

    pub async fn exists(&self, rel: &str) -> bool {
        match self.absolute(rel) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Remove the file at `rel`; a missing file is not an error
    ///
    /// Returns whether a file was actually removed.
    pub async fn delete(&self, rel: &str) -> Result<bool> {
        let path = self.absolute(rel)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %rel, "Deleted blob");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete without propagating failures
    pub async fn delete_best_effort(&self, rel: &str) {
        if let Err(e) = self.delete(rel).await {
            warn!(path = %rel, error = %e, "Failed to delete stored file");
        }
    }

    /// Move `rel` aside so the deletion can be finalized or undone later
    ///
    /// Returns None when there is nothing to delete.
    pub async fn stage_delete(&self, rel: &str) -> Result<Option<StagedDeletion>> {
        let original = self.absolute(rel)?;
        if !tokio::fs::try_exists(&original).await? {
            return Ok(None);
        }

        let trash = self.root.join(TRASH_DIR);
        tokio::fs::create_dir_all(&trash).await?;
        let staged = trash.join(Uuid::new_v4().to_string());
        tokio::fs::rename(&original, &staged).await?;

        Ok(Some(StagedDeletion { original, staged }))
    }
}

/// A file moved into the trash, awaiting the outcome of a transaction
#[derive(Debug)]
pub struct StagedDeletion {
    original: PathBuf,
    staged: PathBuf,
}

impl StagedDeletion {
    /// Permanently remove the staged file
    pub async fn finalize(self) {
        if let Err(e) = tokio::fs::remove_file(&self.staged).await {
            warn!(path = %self.staged.display(), error = %e, "Failed to purge staged file");
        }
    }

    /// Put the staged file back where it was
    pub async fn restore(self) {
        if let Err(e) = tokio::fs::rename(&self.staged, &self.original).await {
            warn!(path = %self.original.display(), error = %e, "Failed to restore staged file");
        }
    }
}
