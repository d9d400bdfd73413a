// # Directory Store Trait
//
// Defines the interface for durable directory state.
//
// ## Purpose
//
// The store holds a full snapshot of the token list. It is read once at
// startup and rewritten in full after every successful registration.
// It is never an append log.
//
// ## Implementations
//
// - File-based: YAML document (`FileDirectoryStore`)
// - Memory: keeps the last snapshot in process (`MemoryDirectoryStore`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;

/// Serialized form of the whole directory
///
/// ```yaml
/// tokens:
///   - token: office
///     ip: 192.0.2.10:8080
///   - token: lab
///     secret: hunter2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDocument {
    /// Entries in provisioning order
    #[serde(default)]
    pub tokens: Vec<StoredEntry>,
}

impl DirectoryDocument {
    /// A document with no tokens
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One token as it appears in the durable document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// The token identifier
    pub token: String,

    /// Registered endpoint; absent means "never registered"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Endpoint>,

    /// Secret required to change the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Time of the last successful registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    /// An entry with only a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ip: None,
            secret: None,
            updated_at: None,
        }
    }

    /// Set the endpoint
    pub fn with_ip(mut self, ip: Endpoint) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Trait for directory store implementations
///
/// Implementations must be thread-safe. The directory serializes all calls to
/// [`save`](DirectoryStore::save), so implementations need not guard against
/// concurrent writers themselves.
///
/// ## Implementation Guidelines
///
/// - **Full snapshot**: `save` replaces everything previously stored
/// - **Scoped I/O**: open and close any handle within a single call
/// - **Atomic**: after a failed `save`, a later `load` must see either the old
///   or the new snapshot, never a mix
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Read the stored snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(Some(doc))`: The stored document
    /// - `Ok(None)`: Nothing has been stored yet
    /// - `Err(Error::Store)`: Unreadable or malformed content
    async fn load(&self) -> Result<Option<DirectoryDocument>, crate::Error>;

    /// Replace the stored snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Snapshot is durable
    /// - `Err(Error::Persistence)`: Nothing was changed
    async fn save(&self, document: &DirectoryDocument) -> Result<(), crate::Error>;

    /// Whether saved snapshots survive a restart
    fn is_durable(&self) -> bool;
}
