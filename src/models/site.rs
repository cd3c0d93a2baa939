//! Rotation site aggregate and its identity.

use std::fmt;

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::Review;

/// Separator between the normalized specialty and hospital name when hashing.
const IDENTITY_SEPARATOR: char = '\u{1f}';

/// Normalize a free-text value for keys and matching.
///
/// Trims, collapses inner whitespace and lower-cases.
pub fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Deterministic site identifier for a `(specialty, hospitalName)` pair.
pub fn site_id_for(specialty: &str, hospital_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(specialty).as_bytes());
    hasher.update(IDENTITY_SEPARATOR.to_string().as_bytes());
    hasher.update(normalize(hospital_name).as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Deterministic review identifier for a client idempotency key.
pub fn review_id_for(idempotency_key: &str) -> String {
    let digest = Sha256::digest(format!("review{IDENTITY_SEPARATOR}{idempotency_key}"));
    hex::encode(&digest[..16])
}

/// Composite store key of a site row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteKey {
    /// Normalized specialty (partition key)
    pub specialty_key: String,
    /// Site identifier (sort key)
    pub site_id: String,
}

impl SiteKey {
    pub fn new(specialty: &str, site_id: impl Into<String>) -> Self {
        Self {
            specialty_key: normalize(specialty),
            site_id: site_id.into(),
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.specialty_key, self.site_id)
    }
}

/// Descriptive location of a site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Location {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into().trim().to_string(),
            state: state.into().trim().to_string(),
        }
    }

    /// Split a combined `"City, State"` string at its last comma.
    ///
    /// A string without a comma is taken as the city.
    pub fn parse(combined: &str) -> Self {
        match combined.rsplit_once(',') {
            Some((city, state)) => Self::new(city, state),
            None => Self::new(combined, ""),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.city.is_empty(), self.state.is_empty()) {
            (false, false) => write!(f, "{}, {}", self.city, self.state),
            (false, true) => f.write_str(&self.city),
            (true, false) => f.write_str(&self.state),
            (true, true) => Ok(()),
        }
    }
}

/// One hospital and specialty pair with its aggregate rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSite {
    pub site_id: String,

    /// Specialty as first submitted
    pub specialty: String,

    pub hospital_name: String,

    pub location: Location,

    /// Mean of all review ratings
    pub average_rating: f64,

    /// Always equals `reviews.len()`
    pub total_reviews: u32,

    pub reviews: Vec<Review>,
}

impl RotationSite {
    /// Create a site from its first review.
    pub fn from_first_review(
        specialty: &str,
        hospital_name: &str,
        location: Location,
        review: Review,
    ) -> Self {
        Self {
            site_id: site_id_for(specialty, hospital_name),
            specialty: specialty.trim().to_string(),
            hospital_name: hospital_name.trim().to_string(),
            location,
            average_rating: review.rating,
            total_reviews: 1,
            reviews: vec![review],
        }
    }

    /// Store key of this site.
    pub fn key(&self) -> SiteKey {
        SiteKey::new(&self.specialty, self.site_id.clone())
    }

    /// Running average after folding in one more rating.
    pub fn average_with(&self, rating: f64) -> f64 {
        let n = f64::from(self.total_reviews);
        (self.average_rating * n + rating) / (n + 1.0)
    }

    /// Whether a review with this identifier is already attached.
    pub fn has_review(&self, review_id: &str) -> bool {
        self.reviews.iter().any(|r| r.review_id == review_id)
    }
}

/// Wire shape of a site; carries the combined `location` string as well.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteView<'a> {
    site_id: &'a str,
    specialty: &'a str,
    hospital_name: &'a str,
    city: &'a str,
    state: &'a str,
    location: String,
    average_rating: f64,
    total_reviews: u32,
    reviews: &'a [Review],
}

impl Serialize for RotationSite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SiteView {
            site_id: &self.site_id,
            specialty: &self.specialty,
            hospital_name: &self.hospital_name,
            city: &self.location.city,
            state: &self.location.state,
            location: self.location.to_string(),
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
            reviews: &self.reviews,
        }
        .serialize(serializer)
    }
}
