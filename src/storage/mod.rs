//! Record store abstractions for rotation site rows.
//!
//! Sites live in one table keyed by `(specialtyKey, siteId)`. Each row is the
//! serialized [`RotationSite`] plus lower-cased shadow attributes used for
//! case-insensitive matching:
//!
//! ```text
//! specialtyKey     partition key, normalized specialty
//! siteId           sort key
//! hospitalNameKey  cityKey  stateKey  locationKey
//! ```
//!
//! Operations are direct passthroughs: no retries, batching or caching.
//! Store failures propagate unchanged as `AppError::Store`, failed
//! conditional writes as `AppError::Conflict`.

pub mod item;
pub mod local;

#[cfg(feature = "dynamodb")]
pub mod dynamo;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Review, RotationSite, SiteKey, StoreBackend, StoreConfig, normalize};

// Re-export for convenience
pub use local::LocalStore;

/// Attribute a condition looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Specialty,
    HospitalName,
    City,
    State,
    Location,
    SiteId,
}

impl Field {
    /// Row attribute holding the matchable form of this field.
    pub fn attribute(self) -> &'static str {
        match self {
            Field::Specialty => item::SPECIALTY_KEY,
            Field::HospitalName => item::HOSPITAL_NAME_KEY,
            Field::City => item::CITY_KEY,
            Field::State => item::STATE_KEY,
            Field::Location => item::LOCATION_KEY,
            Field::SiteId => item::SITE_ID,
        }
    }

    /// Matchable form of this field on a site.
    fn value_of(self, site: &RotationSite) -> String {
        match self {
            Field::Specialty => normalize(&site.specialty),
            Field::HospitalName => normalize(&site.hospital_name),
            Field::City => normalize(&site.location.city),
            Field::State => normalize(&site.location.state),
            Field::Location => normalize(&site.location.to_string()),
            Field::SiteId => site.site_id.clone(),
        }
    }
}

/// A single predicate on a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Case-insensitive substring match
    Contains { field: Field, value: String },
    /// Case-insensitive equality (exact for `SiteId`)
    Equals { field: Field, value: String },
}

impl Condition {
    pub fn contains(field: Field, value: &str) -> Self {
        Self::Contains {
            field,
            value: normalize(value),
        }
    }

    pub fn equals(field: Field, value: &str) -> Self {
        let value = match field {
            Field::SiteId => value.trim().to_string(),
            _ => normalize(value),
        };
        Self::Equals { field, value }
    }

    /// Evaluate against a site in memory.
    pub fn matches(&self, site: &RotationSite) -> bool {
        match self {
            Condition::Contains { field, value } => field.value_of(site).contains(value.as_str()),
            Condition::Equals { field, value } => field.value_of(site) == *value,
        }
    }
}

/// How conditions in a filter combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    All,
    Any,
}

/// Filter applied to queried or scanned rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    pub combine: Combine,
    pub conditions: Vec<Condition>,
}

impl ScanFilter {
    /// Every condition must hold.
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            combine: Combine::All,
            conditions,
        }
    }

    /// At least one condition must hold.
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            combine: Combine::Any,
            conditions,
        }
    }

    /// Evaluate against a site in memory. An empty filter matches everything.
    pub fn matches(&self, site: &RotationSite) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        match self.combine {
            Combine::All => self.conditions.iter().all(|c| c.matches(site)),
            Combine::Any => self.conditions.iter().any(|c| c.matches(site)),
        }
    }
}

/// Write semantics of [`SiteStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Fail with a conflict if the key already exists
    CreateOnly,
    /// Replace whatever is stored under the key
    Overwrite,
}

/// Single-row aggregate mutation guarded by the expected review count.
#[derive(Debug, Clone)]
pub struct SiteUpdate {
    /// `totalReviews` the caller read; the write fails if it changed
    pub expected_total: u32,
    pub average_rating: f64,
    pub review: Review,
}

impl SiteUpdate {
    /// Apply the mutation to an in-memory site after the guard passed.
    pub fn apply(&self, site: &mut RotationSite) {
        site.total_reviews = self.expected_total + 1;
        site.average_rating = self.average_rating;
        site.reviews.push(self.review.clone());
    }
}

/// Trait for site record store backends.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Rows in one specialty partition, optionally filtered.
    async fn query(&self, specialty: &str, filter: Option<&ScanFilter>)
    -> Result<Vec<RotationSite>>;

    /// All rows, optionally filtered.
    async fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<RotationSite>>;

    /// Insert or replace a row.
    async fn put(&self, site: &RotationSite, mode: PutMode) -> Result<()>;

    /// Apply a conditional aggregate update to one row.
    async fn update(&self, key: &SiteKey, update: &SiteUpdate) -> Result<()>;
}

/// Open the store selected by configuration.
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn SiteStore>> {
    match config.backend {
        StoreBackend::Local => {
            log::info!("Using local store at {}", config.local_dir.display());
            Ok(Arc::new(LocalStore::new(&config.local_dir)))
        }
        #[cfg(feature = "dynamodb")]
        StoreBackend::Dynamodb => {
            log::info!("Using DynamoDB table {}", config.table_name);
            Ok(Arc::new(dynamo::DynamoStore::from_env(&config.table_name).await?))
        }
        #[cfg(not(feature = "dynamodb"))]
        StoreBackend::Dynamodb => Err(crate::error::AppError::config(
            "DynamoDB backend requires the 'dynamodb' feature",
        )),
    }
}
