//! Core traits for the token directory
//!
//! - [`DirectoryStore`]: Durable snapshot of the token list

pub mod directory_store;

pub use directory_store::{DirectoryDocument, DirectoryStore, StoredEntry};
