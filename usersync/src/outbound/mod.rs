//! Adapters implementing the domain ports against local resources.

mod atomic_io;
pub mod filesystem;
pub mod json_store;

pub use filesystem::FilesystemSyncStore;
pub use json_store::{JsonIdentityStore, JsonStoreError};
