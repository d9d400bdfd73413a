//! Configuration types for the token directory
//!
//! A directory is always built from a [`DirectoryConfig`]. Its
//! [`ProvisioningMode`] decides where the initial tokens come from, whether
//! mutations are persisted, and whether per-token secrets are enforced.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::endpoint::Endpoint;

/// Default location of the durable directory document
pub const DEFAULT_STORE_PATH: &str = "config.yaml";

/// Default environment prefix that marks a token definition
pub const DEFAULT_TOKEN_PREFIX: &str = "TOKENDNS_TOKEN_";

/// Default environment prefix that marks a token's secret
pub const DEFAULT_SECRET_PREFIX: &str = "TOKENDNS_SECRET_";

/// Main directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Where tokens come from and how mutations are authorized
    #[serde(default)]
    pub mode: ProvisioningMode,

    /// Endpoint assigned to tokens that have none
    #[serde(default)]
    pub default_endpoint: Endpoint,

    /// Naming convention for environment-provisioned tokens
    #[serde(default)]
    pub env: EnvConvention,
}

impl DirectoryConfig {
    /// Create a new configuration with defaults
    pub fn new(mode: ProvisioningMode) -> Self {
        Self {
            mode,
            default_endpoint: Endpoint::loopback(),
            env: EnvConvention::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let StoreMode::File { path } = &self.mode.store {
            if path.as_os_str().is_empty() {
                return Err(crate::Error::config("Directory store path cannot be empty"));
            }
        }

        self.env.validate()
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::new(ProvisioningMode::default())
    }
}

/// Provisioning source and authorization policy, fixed at construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningMode {
    /// Durable or in-memory state
    #[serde(default)]
    pub store: StoreMode,

    /// Whether configured secrets are enforced
    #[serde(default)]
    pub auth: AuthMode,
}

impl ProvisioningMode {
    /// File-backed mode at `path`
    pub fn file(path: impl Into<PathBuf>, auth: AuthMode) -> Self {
        Self {
            store: StoreMode::File { path: path.into() },
            auth,
        }
    }

    /// Environment-backed, memory-only mode
    pub fn environment(auth: AuthMode) -> Self {
        Self {
            store: StoreMode::Memory,
            auth,
        }
    }
}

/// Where the directory state lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreMode {
    /// Durable document, rewritten after every mutation
    File {
        /// Path to the directory document
        path: PathBuf,
    },

    /// In-memory only; tokens come from the environment
    Memory,
}

impl StoreMode {
    /// Whether mutations reach durable storage
    pub fn is_durable(&self) -> bool {
        matches!(self, StoreMode::File { .. })
    }
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::File {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

/// Authorization policy for `register`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Secrets are ignored; every token is open
    Open,
    /// Tokens with a configured secret require it; others stay open
    #[default]
    Secret,
}

/// Environment variable naming for token definitions
///
/// `<token_prefix><NAME>=<token>` defines a token and
/// `<secret_prefix><NAME>=<secret>` attaches a secret to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConvention {
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,

    #[serde(default = "default_secret_prefix")]
    pub secret_prefix: String,
}

impl EnvConvention {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.token_prefix.is_empty() || self.secret_prefix.is_empty() {
            return Err(crate::Error::config(
                "Environment token and secret prefixes cannot be empty",
            ));
        }
        if self.token_prefix.starts_with(&self.secret_prefix)
            || self.secret_prefix.starts_with(&self.token_prefix)
        {
            return Err(crate::Error::config(format!(
                "Environment prefixes overlap: '{}' and '{}'",
                self.token_prefix, self.secret_prefix
            )));
        }
        Ok(())
    }
}

impl Default for EnvConvention {
    fn default() -> Self {
        Self {
            token_prefix: default_token_prefix(),
            secret_prefix: default_secret_prefix(),
        }
    }
}

fn default_token_prefix() -> String {
    DEFAULT_TOKEN_PREFIX.to_string()
}

fn default_secret_prefix() -> String {
    DEFAULT_SECRET_PREFIX.to_string()
}
