//! Review data structures and submission input.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Lowest accepted rating.
pub const MIN_RATING: f64 = 1.0;
/// Highest accepted rating.
pub const MAX_RATING: f64 = 5.0;

/// A single student evaluation embedded in its site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub review_id: String,

    /// Overall rating, 1 to 5
    pub rating: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pros: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cons: Option<String>,

    /// Teaching quality, 1 to 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaching: Option<f64>,

    /// Supervision quality, 1 to 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervision: Option<f64>,

    /// Average weekly hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_weeks: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(default)]
    pub anonymized: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Converted from a bare review identifier; rating is the site average
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub imported: bool,
}

impl Review {
    /// Placeholder for a review known only by its identifier.
    pub fn imported(review_id: impl Into<String>, rating: f64) -> Self {
        Self {
            review_id: review_id.into(),
            rating,
            pros: None,
            cons: None,
            teaching: None,
            supervision: None,
            avg_hours: None,
            start_date: None,
            length_weeks: None,
            team_members: None,
            author_name: None,
            anonymized: false,
            created_at: None,
            imported: true,
        }
    }
}

/// Review fields as submitted by the form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,

    #[serde(default)]
    pub pros: Option<String>,

    #[serde(default)]
    pub cons: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub teaching: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub supervision: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub avg_hours: Option<f64>,

    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub length_weeks: Option<u32>,

    #[serde(default)]
    pub team_members: Option<String>,

    #[serde(default)]
    pub author_name: Option<String>,

    #[serde(default)]
    pub anonymized: bool,
}

impl ReviewInput {
    /// Check the input and turn it into a stored review.
    pub fn into_review(self, review_id: String, created_at: DateTime<Utc>) -> Result<Review> {
        let rating = self
            .rating
            .ok_or_else(|| AppError::validation("review.rating is required"))?;
        check_rating("review.rating", rating)?;

        let teaching = optional_rating("review.teaching", self.teaching)?;
        let supervision = optional_rating("review.supervision", self.supervision)?;

        if let Some(hours) = self.avg_hours {
            if !hours.is_finite() || hours < 0.0 {
                return Err(AppError::validation(
                    "review.avgHours must be a non-negative number",
                ));
            }
        }

        Ok(Review {
            review_id,
            rating,
            pros: non_blank(self.pros),
            cons: non_blank(self.cons),
            teaching,
            supervision,
            avg_hours: self.avg_hours,
            start_date: non_blank(self.start_date),
            length_weeks: self.length_weeks.filter(|w| *w > 0),
            team_members: non_blank(self.team_members),
            author_name: if self.anonymized {
                None
            } else {
                non_blank(self.author_name)
            },
            anonymized: self.anonymized,
            created_at: Some(created_at),
            imported: false,
        })
    }
}

fn check_rating(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(AppError::validation(format!(
            "{field} must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

/// The form sends `0` for an unset secondary rating.
fn optional_rating(field: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        None => Ok(None),
        Some(v) if v == 0.0 => Ok(None),
        Some(v) => check_rating(field, v).map(|_| Some(v)),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Accept a number, a numeric string, an empty string or null.
fn lenient_number<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid number: {s}"))),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(de::Error::custom),
    }
}
