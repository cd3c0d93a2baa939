// src/models/mod.rs

//! Domain models for the rotations backend.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
pub mod legacy;
mod request;
mod review;
mod search;
mod site;

// Re-export all public types
pub use config::{ApiConfig, Config, LoggingConfig, SitemapConfig, StoreBackend, StoreConfig};
pub use legacy::SiteRecord;
pub use request::SubmitRequest;
pub use review::{MAX_RATING, MIN_RATING, Review, ReviewInput};
pub use search::{Page, SearchFilters, SearchQuery, SearchResults};
pub use site::{Location, RotationSite, SiteKey, normalize, review_id_for, site_id_for};
