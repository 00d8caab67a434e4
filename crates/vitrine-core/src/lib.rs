//! Vitrine Core Library
//!
//! This crate provides core domain models, error types, configuration, and
//! contract constants that are shared across all Vitrine components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ProductImage, Rendition, RenditionFormat, RenditionTier, SourceFormat, RENDITION_COUNT,
};
