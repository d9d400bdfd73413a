//! Startup provisioning
//!
//! Produces the initial [`Directory`] exactly once, before anything is served.
//!
//! ## Precedence
//!
//! 1. Token definitions found in the environment replace whatever the durable
//!    store holds. In file-backed mode they are written out as the new
//!    baseline.
//! 2. Otherwise the durable store is loaded.
//! 3. If the store does not exist yet, an empty directory is written as the
//!    baseline.
//!
//! An unreadable or malformed store is an error; there is no partial load.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{DirectoryConfig, EnvConvention, StoreMode};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::state::{FileDirectoryStore, MemoryDirectoryStore};
use crate::traits::{DirectoryDocument, DirectoryStore, StoredEntry};

/// Where the initial token set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionSource {
    /// Environment token definitions
    Environment,
    /// Existing durable store
    Store,
    /// Nothing found; started empty
    Empty,
}

/// Build the directory from the process environment
pub async fn load_directory_from_env(config: &DirectoryConfig) -> Result<Directory> {
    load_directory(config, std::env::vars()).await
}

/// Build the directory from `vars` and the configured store
///
/// `vars` is any `(name, value)` enumeration; its order does not matter.
pub async fn load_directory<I>(config: &DirectoryConfig, vars: I) -> Result<Directory>
where
    I: IntoIterator<Item = (String, String)>,
{
    config.validate()?;

    let store: Arc<dyn DirectoryStore> = match &config.mode.store {
        StoreMode::File { path } => Arc::new(FileDirectoryStore::new(path).await?),
        StoreMode::Memory => Arc::new(MemoryDirectoryStore::new()),
    };

    let (document, source) = provision(store.as_ref(), &config.env, vars).await?;

    let directory = Directory::new(
        document,
        store,
        config.mode.auth,
        &config.default_endpoint,
    )?;

    match source {
        ProvisionSource::Environment => {
            info!("Provisioned {} token(s) from environment", directory.len());
        }
        ProvisionSource::Store => {
            info!("Provisioned {} token(s) from directory store", directory.len());
        }
        ProvisionSource::Empty => {
            warn!("No tokens provisioned; every request will be rejected");
        }
    }

    Ok(directory)
}

/// Decide the initial document and establish it as the store's baseline
pub async fn provision<I>(
    store: &dyn DirectoryStore,
    convention: &EnvConvention,
    vars: I,
) -> Result<(DirectoryDocument, ProvisionSource)>
where
    I: IntoIterator<Item = (String, String)>,
{
    if let Some(document) = scan_env(convention, vars)? {
        store.save(&document).await.map_err(|e| {
            Error::store(format!("Failed to write provisioned baseline: {}", e))
        })?;
        return Ok((document, ProvisionSource::Environment));
    }

    if let Some(document) = store.load().await? {
        let source = if document.tokens.is_empty() {
            ProvisionSource::Empty
        } else {
            ProvisionSource::Store
        };
        return Ok((document, source));
    }

    let document = DirectoryDocument::empty();
    store
        .save(&document)
        .await
        .map_err(|e| Error::store(format!("Failed to initialize directory store: {}", e)))?;
    Ok((document, ProvisionSource::Empty))
}

/// Collect token definitions from `vars`
///
/// Returns `None` when no variable carries the token prefix. Entries are
/// ordered by variable name so the result is independent of enumeration order.
///
/// # Errors
///
/// `Error::Config` when two variables define the same token.
pub fn scan_env<I>(convention: &EnvConvention, vars: I) -> Result<Option<DirectoryDocument>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut tokens = BTreeMap::new();
    let mut secrets = BTreeMap::new();

    for (key, value) in vars {
        if let Some(name) = key.strip_prefix(&convention.token_prefix) {
            tokens.insert(name.to_string(), value);
        } else if let Some(name) = key.strip_prefix(&convention.secret_prefix) {
            secrets.insert(name.to_string(), value);
        }
    }

    if tokens.is_empty() {
        return Ok(None);
    }

    for name in secrets.keys() {
        if !tokens.contains_key(name) {
            warn!(
                "Ignoring {}{}: no matching {}{}",
                convention.secret_prefix, name, convention.token_prefix, name
            );
        }
    }

    let mut seen = BTreeMap::new();
    let mut document = DirectoryDocument::empty();

    for (name, token) in tokens {
        if token.is_empty() {
            warn!("Ignoring empty token {}{}", convention.token_prefix, name);
            continue;
        }
        if let Some(previous) = seen.insert(token.clone(), name.clone()) {
            return Err(Error::config(format!(
                "Token defined twice: {}{} and {}{}",
                convention.token_prefix, previous, convention.token_prefix, name
            )));
        }

        let mut entry = StoredEntry::new(token);
        match secrets.remove(&name) {
            Some(secret) if !secret.is_empty() => entry = entry.with_secret(secret),
            Some(_) => warn!("Ignoring empty secret {}{}", convention.secret_prefix, name),
            None => {}
        }
        document.tokens.push(entry);
    }

    Ok(Some(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_scan_env_pairs_secrets() {
        let convention = EnvConvention::default();
        let doc = scan_env(
            &convention,
            vars(&[
                ("PATH", "/usr/bin"),
                ("TOKENDNS_TOKEN_B", "beta"),
                ("TOKENDNS_SECRET_B", "s3"),
                ("TOKENDNS_TOKEN_A", "alpha"),
            ]),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            doc.tokens,
            vec![
                StoredEntry::new("alpha"),
                StoredEntry::new("beta").with_secret("s3"),
            ]
        );
    }

    #[test]
    fn test_scan_env_order_independent() {
        let convention = EnvConvention::default();
        let mut pairs = vars(&[
            ("TOKENDNS_SECRET_X", "sx"),
            ("TOKENDNS_TOKEN_Y", "y"),
            ("TOKENDNS_TOKEN_X", "x"),
        ]);
        let forward = scan_env(&convention, pairs.clone()).unwrap();
        pairs.reverse();
        let backward = scan_env(&convention, pairs).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_scan_env_none_without_tokens() {
        let convention = EnvConvention::default();
        let result = scan_env(&convention, vars(&[("TOKENDNS_SECRET_A", "orphan")])).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_scan_env_duplicate_token() {
        let convention = EnvConvention::default();
        let result = scan_env(
            &convention,
            vars(&[("TOKENDNS_TOKEN_A", "same"), ("TOKENDNS_TOKEN_B", "same")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_scan_env_skips_empty_values() {
        let convention = EnvConvention::default();
        let doc = scan_env(
            &convention,
            vars(&[
                ("TOKENDNS_TOKEN_A", ""),
                ("TOKENDNS_TOKEN_B", "b"),
                ("TOKENDNS_SECRET_B", ""),
            ]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(doc.tokens, vec![StoredEntry::new("b")]);
    }

    #[tokio::test]
    async fn test_provision_initializes_missing_store() {
        let store = MemoryDirectoryStore::new();
        let (doc, source) = provision(&store, &EnvConvention::default(), Vec::new())
            .await
            .unwrap();
        assert_eq!(source, ProvisionSource::Empty);
        assert_eq!(doc, DirectoryDocument::empty());
        assert_eq!(store.snapshot().await, Some(DirectoryDocument::empty()));
    }

    #[tokio::test]
    async fn test_provision_env_replaces_store() {
        let store = MemoryDirectoryStore::with_document(DirectoryDocument {
            tokens: vec![StoredEntry::new("old")],
        });
        let (doc, source) = provision(
            &store,
            &EnvConvention::default(),
            vars(&[("TOKENDNS_TOKEN_NEW", "new")]),
        )
        .await
        .unwrap();
        assert_eq!(source, ProvisionSource::Environment);
        assert_eq!(doc.tokens, vec![StoredEntry::new("new")]);
        assert_eq!(store.snapshot().await, Some(doc));
    }
}
