// # File Directory Store
//
// File-based implementation of DirectoryStore.
//
// ## Durability
//
// - Atomic writes: the snapshot is written to `<path>.tmp`, flushed, synced,
//   then renamed over the real file
// - Scoped handles: every read and write opens and closes its own handle
// - No recovery: a document that fails to parse is reported, never replaced
//
// ## File Format
//
// ```yaml
// tokens:
//   - token: office
//     ip: 192.0.2.10
//     updated_at: 2025-01-09T12:00:00Z
//   - token: lab
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::directory_store::{DirectoryDocument, DirectoryStore};

/// YAML-file directory store
///
/// # Example
///
/// ```rust,no_run
/// use tokendns_core::state::FileDirectoryStore;
/// use tokendns_core::traits::{DirectoryDocument, DirectoryStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileDirectoryStore::new("/var/lib/tokendns/config.yaml").await?;
///
///     if store.load().await?.is_none() {
///         store.save(&DirectoryDocument::empty()).await?;
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileDirectoryStore {
    path: PathBuf,
}

impl FileDirectoryStore {
    /// Create a store at `path`, creating parent directories if needed
    ///
    /// The file itself is not touched until the first `load` or `save`.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create directory store parent {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path })
    }

    /// Path of the directory document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used for atomic writes
    ///
    /// `.tmp` is appended to the whole file name, so it never equals the
    /// store path, whatever extension that has.
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_temp(&self, temp_path: &Path, content: &[u8]) -> Result<(), Error> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(content).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::persistence(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            Error::persistence(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl DirectoryStore for FileDirectoryStore {
    async fn load(&self) -> Result<Option<DirectoryDocument>, Error> {
        let exists = fs::try_exists(&self.path).await.map_err(|e| {
            Error::store(format!("Failed to stat {}: {}", self.path.display(), e))
        })?;
        if !exists {
            tracing::debug!("Directory store does not exist: {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read directory store {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let document: DirectoryDocument = serde_yaml::from_str(&content).map_err(|e| {
            Error::store(format!(
                "Failed to parse directory store {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(
            "Loaded directory store {}: {} token(s)",
            self.path.display(),
            document.tokens.len()
        );
        Ok(Some(document))
    }

    async fn save(&self, document: &DirectoryDocument) -> Result<(), Error> {
        let yaml = serde_yaml::to_string(document)
            .map_err(|e| Error::persistence(format!("Failed to serialize directory: {}", e)))?;

        let temp_path = self.temp_path();
        if let Err(e) = self.write_temp(&temp_path, yaml.as_bytes()).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Directory written to {}", self.path.display());
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}
