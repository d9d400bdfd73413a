// # tokendns-core
//
// Core library for the token endpoint directory.
//
// ## Architecture Overview
//
// Clients register an opaque, pre-provisioned token with an IP endpoint;
// other clients resolve the token to that endpoint.
//
// - **Endpoint**: Validated IP literal with optional port
// - **Directory**: Owns the token → entry table; `lookup` and `register`
// - **DirectoryStore**: Trait for the durable full-state snapshot
// - **Provisioning**: One-shot startup loader (environment or durable store)
//
// ## Design Principles
//
// 1. **Closed token set**: Tokens are provisioned, never created by requests
// 2. **Validate, then mutate**: No partially-valid endpoint is ever stored
// 3. **Durable before visible**: A registration is persisted before lookups
//    can observe it
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod directory;
pub mod endpoint;
pub mod error;
pub mod provisioning;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{AuthMode, DirectoryConfig, EnvConvention, ProvisioningMode, StoreMode};
pub use directory::{Directory, DirectoryEntry, Registration};
pub use endpoint::Endpoint;
pub use error::{EndpointError, Error, ErrorKind, Result};
pub use provisioning::{load_directory, load_directory_from_env};
pub use state::{FileDirectoryStore, MemoryDirectoryStore};
pub use traits::{DirectoryDocument, DirectoryStore, StoredEntry};
