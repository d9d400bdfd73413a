// # Directory Store Implementations
//
// This module provides implementations of the DirectoryStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileDirectoryStore;
pub use memory::MemoryDirectoryStore;
