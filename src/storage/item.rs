//! Row encoding shared by the store backends.

use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{RotationSite, SiteRecord, normalize};

/// Partition key attribute.
pub const SPECIALTY_KEY: &str = "specialtyKey";
/// Sort key attribute.
pub const SITE_ID: &str = "siteId";
pub const HOSPITAL_NAME_KEY: &str = "hospitalNameKey";
pub const CITY_KEY: &str = "cityKey";
pub const STATE_KEY: &str = "stateKey";
pub const LOCATION_KEY: &str = "locationKey";
pub const TOTAL_REVIEWS: &str = "totalReviews";
pub const AVERAGE_RATING: &str = "averageRating";
pub const REVIEWS: &str = "reviews";

/// Encode a site as a stored row with its shadow attributes.
pub fn to_item(site: &RotationSite) -> Result<Map<String, Value>> {
    let mut row = match serde_json::to_value(site)? {
        Value::Object(map) => map,
        other => {
            return Err(AppError::store(format!(
                "site encoded as non-object: {other}"
            )));
        }
    };

    row.insert(SPECIALTY_KEY.into(), normalize(&site.specialty).into());
    row.insert(HOSPITAL_NAME_KEY.into(), normalize(&site.hospital_name).into());
    row.insert(CITY_KEY.into(), normalize(&site.location.city).into());
    row.insert(STATE_KEY.into(), normalize(&site.location.state).into());
    row.insert(
        LOCATION_KEY.into(),
        normalize(&site.location.to_string()).into(),
    );
    Ok(row)
}

/// Decode a stored row, whatever shape it was written in.
pub fn from_item(row: Value) -> Result<RotationSite> {
    let record: SiteRecord = serde_json::from_value(row)?;
    Ok(RotationSite::from(record))
}
