//! Test doubles and common utilities for directory contract tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokendns_core::traits::{DirectoryDocument, DirectoryStore, StoredEntry};
use tokendns_core::{AuthMode, Directory, Endpoint, Error, MemoryDirectoryStore};

/// A DirectoryStore that counts writes and can be told to fail or stall
#[derive(Clone, Default)]
pub struct MockDirectoryStore {
    inner: MemoryDirectoryStore,
    fail_saves: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
    save_delay: Option<Duration>,
    delay_after_write: Option<Duration>,
}

impl MockDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save sleeps for `delay` before completing
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Every save writes its snapshot, then sleeps for `delay` before returning
    pub fn with_delay_after_write(mut self, delay: Duration) -> Self {
        self.delay_after_write = Some(delay);
        self
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Last saved snapshot
    pub async fn snapshot(&self) -> Option<DirectoryDocument> {
        self.inner.snapshot().await
    }
}

#[async_trait::async_trait]
impl DirectoryStore for MockDirectoryStore {
    async fn load(&self) -> Result<Option<DirectoryDocument>, Error> {
        self.inner.load().await
    }

    async fn save(&self, document: &DirectoryDocument) -> Result<(), Error> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::persistence("injected write failure"));
        }
        self.inner.save(document).await?;
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay_after_write {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }
}

/// Tokens used across contract tests: two open, one with a secret
pub fn sample_document() -> DirectoryDocument {
    DirectoryDocument {
        tokens: vec![
            StoredEntry::new("alpha"),
            StoredEntry::new("beta"),
            StoredEntry::new("gamma").with_secret("Open-Sesame"),
        ],
    }
}

/// A secret-enforcing directory over `store`
pub fn directory_with(store: &MockDirectoryStore) -> Arc<Directory> {
    Arc::new(
        Directory::new(
            sample_document(),
            Arc::new(store.clone()),
            AuthMode::Secret,
            &Endpoint::loopback(),
        )
        .expect("sample document is valid"),
    )
}

/// Endpoint stored for `token` in `document`
pub fn stored_ip(document: &DirectoryDocument, token: &str) -> Option<String> {
    document
        .tokens
        .iter()
        .find(|entry| entry.token == token)
        .and_then(|entry| entry.ip.as_ref())
        .map(|ip| ip.as_str().to_string())
}
