//! Inbound request payloads.

use serde::Deserialize;

use super::{Location, ReviewInput};
use crate::error::{AppError, Result};

/// Body of a review submission.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub hospital_name: String,

    #[serde(default)]
    pub specialty: String,

    /// Combined `"City, State"` as sent by the form
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub review: Option<ReviewInput>,

    /// Client-chosen key making retries of one submission safe
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl SubmitRequest {
    /// Reject submissions missing required fields.
    pub fn validate(&self) -> Result<()> {
        if self.hospital_name.trim().is_empty() {
            return Err(AppError::validation("hospitalName is required"));
        }
        if self.specialty.trim().is_empty() {
            return Err(AppError::validation("specialty is required"));
        }
        if self.review.is_none() {
            return Err(AppError::validation("review is required"));
        }
        if matches!(&self.idempotency_key, Some(k) if k.trim().is_empty()) {
            return Err(AppError::validation("idempotencyKey must not be blank"));
        }
        Ok(())
    }

    /// Location from split fields when present, otherwise the combined string.
    pub fn site_location(&self) -> Location {
        if self.city.is_some() || self.state.is_some() {
            Location::new(
                self.city.clone().unwrap_or_default(),
                self.state.clone().unwrap_or_default(),
            )
        } else {
            self.location
                .as_deref()
                .map(Location::parse)
                .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_parses() {
        let req: SubmitRequest = serde_json::from_str(
            r#"{
                "hospitalName": "St. Mary",
                "specialty": "Cardiology",
                "location": "Boston, MA",
                "review": {"rating": 4, "pros": "", "cons": "", "avgHours": "", "teaching": 0, "supervision": 0}
            }"#,
        )
        .unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(req.site_location(), Location::new("Boston", "MA"));
    }

    #[test]
    fn split_location_wins() {
        let req = SubmitRequest {
            location: Some("Ignored, XX".into()),
            city: Some("Austin".into()),
            state: Some("TX".into()),
            ..Default::default()
        };
        assert_eq!(req.site_location(), Location::new("Austin", "TX"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut req = SubmitRequest {
            hospital_name: "St. Mary".into(),
            specialty: "  ".into(),
            review: Some(ReviewInput::default()),
            ..Default::default()
        };
        assert!(req.validate().is_err());

        req.specialty = "Cardiology".into();
        assert!(req.validate().is_ok());

        req.review = None;
        assert!(req.validate().is_err());
    }
}
