// # Memory Directory Store
//
// In-memory implementation of DirectoryStore.
//
// ## Purpose
//
// Backs environment-provisioned directories. Tokens are re-read from the
// environment on every start, so nothing needs to survive a restart.
//
// ## Crash Behavior
//
// - All registrations are lost on restart
// - Every token starts at the default endpoint again

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::directory_store::{DirectoryDocument, DirectoryStore};

/// In-memory directory store
///
/// Keeps the most recently saved snapshot. Clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectoryStore {
    inner: Arc<RwLock<Option<DirectoryDocument>>>,
}

impl MemoryDirectoryStore {
    /// Create an empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `document`
    pub fn with_document(document: DirectoryDocument) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(document))),
        }
    }

    /// The last saved snapshot
    pub async fn snapshot(&self) -> Option<DirectoryDocument> {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn load(&self) -> Result<Option<DirectoryDocument>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, document: &DirectoryDocument) -> Result<(), Error> {
        *self.inner.write().await = Some(document.clone());
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
