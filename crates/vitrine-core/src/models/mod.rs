//! Data models for the application
//!
//! This module contains the data structures used throughout the ingestion
//! pipeline, organized by domain.

mod product_image;

// Re-export all models for convenient imports
pub use product_image::*;
