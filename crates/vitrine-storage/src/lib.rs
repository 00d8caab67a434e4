//! Vitrine Storage Library
//!
//! This crate provides the storage abstraction for persisted renditions and
//! the scratch space for in-flight uploads.
//!
//! # Storage key format
//!
//! Rendition keys follow one layout across backends:
//!
//! - `products/{product_id}/{image_id}/{tier}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so every writer stays consistent.
//!
//! Temp artifacts never live under a storage key; they belong to [`TempStore`]
//! and are unconditionally removed at the end of each request.

pub mod keys;
pub mod local;
pub mod temp;
pub mod traits;

// Re-export commonly used types
pub use keys::rendition_storage_key;
pub use local::LocalStorage;
pub use temp::{TempFile, TempStore};
pub use traits::{Storage, StorageError, StorageResult};
