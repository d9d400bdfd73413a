//! Token directory
//!
//! The [`Directory`] owns the token → entry mapping. It is the only thing that
//! mutates it, and it does so only through [`Directory::register`].
//!
//! ## Register flow
//!
//! ```text
//!  register(token, secret?, endpoint?, origin?)
//!        │
//!        ▼
//!  ┌──────────────┐  unknown        ┌──────────────┐
//!  │ token known? │───────────────▶ │ InvalidToken │
//!  └──────────────┘                 └──────────────┘
//!        │                          ┌──────────────┐
//!  secret matches (if required)? ──▶│  Forbidden   │
//!        │                          └──────────────┘
//!  endpoint or origin present?  ───▶ MissingEndpoint
//!        │
//!  endpoint valid?              ───▶ InvalidEndpoint
//!        │
//!  store.save(full snapshot)    ───▶ Persistence (memory untouched)
//!        │
//!  swap in-memory entry
//! ```
//!
//! ## Concurrency
//!
//! Lookups take a short read lock on the table. Registrations are serialized
//! by an async mutex held from validation through the in-memory swap; the
//! table itself is write-locked only for the swap, so lookups proceed while
//! the store is being written.
//!
//! The write and the swap run in their own task, which also owns the mutex
//! guard. A caller that drops its `register` future cannot stop a write
//! halfway, and the next registration waits until the swap is done.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::AuthMode;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::traits::{DirectoryDocument, DirectoryStore, StoredEntry};

/// One token's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Where the token currently points
    pub endpoint: Endpoint,
    /// Secret required to change `endpoint`, if any
    pub secret: Option<String>,
    /// Time of the last successful registration
    pub updated_at: Option<DateTime<Utc>>,
}

/// Successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub token: String,
    pub endpoint: Endpoint,
}

/// Token table, kept in provisioning order
#[derive(Debug, Default)]
struct Table {
    order: Vec<String>,
    entries: HashMap<String, DirectoryEntry>,
}

impl Table {
    fn from_document(document: DirectoryDocument, default_endpoint: &Endpoint) -> Result<Self> {
        let mut table = Table::default();

        for stored in document.tokens {
            if table.entries.contains_key(&stored.token) {
                return Err(Error::store(format!(
                    "Duplicate token in directory: {}",
                    stored.token
                )));
            }

            let entry = DirectoryEntry {
                endpoint: stored.ip.unwrap_or_else(|| default_endpoint.clone()),
                secret: stored.secret,
                updated_at: stored.updated_at,
            };
            table.order.push(stored.token.clone());
            table.entries.insert(stored.token, entry);
        }

        Ok(table)
    }

    /// Full snapshot, with `token` replaced by `replacement` if given
    fn to_document(&self, replacement: Option<(&str, &DirectoryEntry)>) -> DirectoryDocument {
        let tokens = self
            .order
            .iter()
            .filter_map(|token| {
                let entry = match replacement {
                    Some((replaced, entry)) if replaced == token.as_str() => entry,
                    _ => self.entries.get(token)?,
                };
                Some(StoredEntry {
                    token: token.clone(),
                    ip: Some(entry.endpoint.clone()),
                    secret: entry.secret.clone(),
                    updated_at: entry.updated_at,
                })
            })
            .collect();

        DirectoryDocument { tokens }
    }
}

/// The token → endpoint directory
///
/// Construct one per process (normally through
/// [`provisioning::load_directory`](crate::provisioning::load_directory)) and
/// share it behind an `Arc`.
pub struct Directory {
    shared: Arc<Shared>,
    auth: AuthMode,
    register_lock: Arc<Mutex<()>>,
}

/// State reachable from a detached commit task
struct Shared {
    table: RwLock<Table>,
    store: Arc<dyn DirectoryStore>,
}

impl Shared {
    fn read_table(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `document`, then swap `entry` in for `token`
    async fn commit(
        &self,
        token: &str,
        entry: DirectoryEntry,
        document: DirectoryDocument,
    ) -> Result<()> {
        self.store.save(&document).await.map_err(|e| match e {
            Error::Persistence(_) => e,
            other => Error::persistence(other.to_string()),
        })?;

        self.write_table().entries.insert(token.to_string(), entry);
        Ok(())
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("tokens", &self.len())
            .field("auth", &self.auth)
            .field("durable", &self.is_durable())
            .finish()
    }
}

impl Directory {
    /// Build a directory from an initial document
    ///
    /// Entries without an endpoint get `default_endpoint`. The document is not
    /// written back; provisioning decides whether it needs to be.
    ///
    /// # Errors
    ///
    /// `Error::Store` if the document names the same token twice.
    pub fn new(
        document: DirectoryDocument,
        store: Arc<dyn DirectoryStore>,
        auth: AuthMode,
        default_endpoint: &Endpoint,
    ) -> Result<Self> {
        Ok(Self {
            shared: Arc::new(Shared {
                table: RwLock::new(Table::from_document(document, default_endpoint)?),
                store,
            }),
            auth,
            register_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Resolve `token` to its endpoint
    ///
    /// # Errors
    ///
    /// `Error::InvalidToken` if the token is not provisioned.
    pub fn lookup(&self, token: &str) -> Result<Endpoint> {
        let table = self.read_table();
        match table.entries.get(token) {
            Some(entry) => {
                debug!(token, endpoint = %entry.endpoint, "Lookup");
                Ok(entry.endpoint.clone())
            }
            None => {
                debug!(token, "Lookup for unknown token");
                Err(Error::InvalidToken)
            }
        }
    }

    /// Point `token` at a new endpoint
    ///
    /// `endpoint` wins over `origin_hint`; empty strings count as absent.
    /// Registering the endpoint already stored succeeds without writing.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidToken`: token is not provisioned
    /// - `Error::Forbidden`: token has a secret and `secret` does not match it
    /// - `Error::MissingEndpoint`: neither `endpoint` nor `origin_hint` given
    /// - `Error::InvalidEndpoint`: the chosen endpoint failed validation
    /// - `Error::Persistence`: the store rejected the new snapshot; the
    ///   in-memory entry is unchanged
    ///
    /// Must be called within a Tokio runtime.
    pub async fn register(
        &self,
        token: &str,
        secret: Option<&str>,
        endpoint: Option<&str>,
        origin_hint: Option<&str>,
    ) -> Result<Registration> {
        let serialized = Arc::clone(&self.register_lock).lock_owned().await;

        let result = self
            .register_serialized(serialized, token, secret, endpoint, origin_hint)
            .await;

        match &result {
            Ok(registration) => {
                info!(token, endpoint = %registration.endpoint, "Registered endpoint");
            }
            Err(e @ Error::Persistence(_)) => {
                error!(token, "Registration not persisted: {}", e);
            }
            Err(e) => {
                warn!(token, "Registration rejected: {}", e);
            }
        }

        result
    }

    /// Validate, then hand persist-and-swap to a task holding `serialized`
    async fn register_serialized(
        &self,
        serialized: OwnedMutexGuard<()>,
        token: &str,
        secret: Option<&str>,
        endpoint: Option<&str>,
        origin_hint: Option<&str>,
    ) -> Result<Registration> {
        let (updated, document) = {
            let table = self.shared.read_table();
            let current = table.entries.get(token).ok_or(Error::InvalidToken)?;
            self.authorize(current, secret)?;

            let candidate = non_empty(endpoint)
                .or_else(|| non_empty(origin_hint))
                .ok_or(Error::MissingEndpoint)?;
            let endpoint = Endpoint::parse(candidate)?;

            if current.endpoint == endpoint {
                debug!(token, endpoint = %endpoint, "Endpoint unchanged, skipping write");
                return Ok(Registration {
                    token: token.to_string(),
                    endpoint,
                });
            }

            let updated = DirectoryEntry {
                endpoint,
                secret: current.secret.clone(),
                updated_at: Some(Utc::now()),
            };
            let document = table.to_document(Some((token, &updated)));
            (updated, document)
        };

        let endpoint = updated.endpoint.clone();
        let shared = Arc::clone(&self.shared);
        let owned_token = token.to_string();
        let commit = tokio::spawn(async move {
            let result = shared.commit(&owned_token, updated, document).await;
            drop(serialized);
            result
        });

        commit
            .await
            .map_err(|e| Error::persistence(format!("Commit task failed: {}", e)))??;

        Ok(Registration {
            token: token.to_string(),
            endpoint,
        })
    }

    fn authorize(&self, entry: &DirectoryEntry, supplied: Option<&str>) -> Result<()> {
        if self.auth == AuthMode::Open {
            return Ok(());
        }
        match (&entry.secret, supplied) {
            (None, _) => Ok(()),
            (Some(required), Some(supplied)) if required == supplied => Ok(()),
            (Some(_), _) => Err(Error::Forbidden),
        }
    }

    /// Provisioned tokens in provisioning order
    pub fn tokens(&self) -> Vec<String> {
        self.read_table().order.clone()
    }

    /// Current state of `token`
    pub fn entry(&self, token: &str) -> Option<DirectoryEntry> {
        self.read_table().entries.get(token).cloned()
    }

    /// Number of provisioned tokens
    pub fn len(&self) -> usize {
        self.read_table().order.len()
    }

    /// Whether no tokens are provisioned
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full snapshot in the durable layout
    pub fn document(&self) -> DirectoryDocument {
        self.read_table().to_document(None)
    }

    /// Authorization policy in effect
    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }

    /// Whether registrations survive a restart
    pub fn is_durable(&self) -> bool {
        self.shared.store.is_durable()
    }

    fn read_table(&self) -> RwLockReadGuard<'_, Table> {
        self.shared.read_table()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
