//! Decoding of stored site rows, including older row shapes.
//!
//! Rows written by earlier versions carry a single `location` string and a
//! list of bare review identifiers. Every row read from a store goes through
//! [`SiteRecord`] so the services only ever see the canonical shape.

use serde::Deserialize;

use super::{Location, Review, RotationSite};

/// Permissive stored row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub site_id: String,

    pub specialty: String,

    #[serde(default)]
    pub hospital_name: String,

    /// Combined `"City, State"` from older rows
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub average_rating: f64,

    #[serde(default)]
    pub total_reviews: Option<u32>,

    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
}

/// A review as stored: a full object or, in older rows, only its identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReviewEntry {
    Full(Review),
    Id(String),
}

impl SiteRecord {
    fn resolve_location(&self) -> Location {
        match (&self.city, &self.state) {
            (None, None) => self
                .location
                .as_deref()
                .map(Location::parse)
                .unwrap_or_default(),
            (city, state) => Location::new(
                city.clone().unwrap_or_default(),
                state.clone().unwrap_or_default(),
            ),
        }
    }
}

impl From<SiteRecord> for RotationSite {
    fn from(record: SiteRecord) -> Self {
        let location = record.resolve_location();

        if record.reviews.is_empty() && record.total_reviews.unwrap_or(0) > 0 {
            log::warn!(
                "Site {} claims {} reviews but stores none; resetting aggregate",
                record.site_id,
                record.total_reviews.unwrap_or(0)
            );
        }

        let average = record.average_rating;
        let reviews: Vec<Review> = record
            .reviews
            .into_iter()
            .map(|entry| match entry {
                ReviewEntry::Full(review) => review,
                ReviewEntry::Id(id) => Review::imported(id, average),
            })
            .collect();

        let average_rating = if reviews.is_empty() { 0.0 } else { average };

        RotationSite {
            site_id: record.site_id,
            specialty: record.specialty,
            hospital_name: record.hospital_name,
            location,
            average_rating,
            total_reviews: reviews.len() as u32,
            reviews,
        }
    }
}
