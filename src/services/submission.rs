//! Review submission and rating aggregation.
//!
//! A submission either creates the site for its `(specialty, hospitalName)`
//! pair or folds the review into the existing site's running average. The
//! site id is derived from the pair and creation is a conditional insert, so
//! two first submissions racing for the same pair cannot both create a row:
//! the loser sees a conflict, re-reads and updates instead. Updates are
//! compare-and-swap on `totalReviews`.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{RotationSite, SubmitRequest, review_id_for, site_id_for};
use crate::storage::{Condition, Field, PutMode, ScanFilter, SiteStore, SiteUpdate};

/// What a submission did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitOutcome {
    /// First review for the pair; a site row was inserted
    Created,
    /// Review folded into an existing site
    Updated,
    /// Review was already attached (idempotent retry); nothing written
    Duplicate,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub site_id: String,
    pub review_id: String,
    pub outcome: SubmitOutcome,
}

/// Attaches reviews to sites.
pub struct ReviewSubmitter {
    store: Arc<dyn SiteStore>,
    max_attempts: u32,
}

impl ReviewSubmitter {
    pub fn new(store: Arc<dyn SiteStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Validate and apply one review submission.
    pub async fn submit(&self, mut request: SubmitRequest) -> Result<Submission> {
        request.validate()?;

        let review_id = match request.idempotency_key.as_deref() {
            Some(key) => review_id_for(key.trim()),
            None => Uuid::new_v4().to_string(),
        };
        let review = request
            .review
            .take()
            .ok_or_else(|| AppError::validation("review is required"))?
            .into_review(review_id, Utc::now())?;

        let canonical_id = site_id_for(&request.specialty, &request.hospital_name);
        let same_hospital = ScanFilter::all(vec![Condition::equals(
            Field::HospitalName,
            &request.hospital_name,
        )]);

        for attempt in 1..=self.max_attempts {
            let matches = self
                .store
                .query(&request.specialty, Some(&same_hospital))
                .await?;

            let written = match pick_site(matches, &canonical_id) {
                None => {
                    let site = RotationSite::from_first_review(
                        &request.specialty,
                        &request.hospital_name,
                        request.site_location(),
                        review.clone(),
                    );
                    self.store
                        .put(&site, PutMode::CreateOnly)
                        .await
                        .map(|_| (site.site_id, SubmitOutcome::Created))
                }
                Some(site) if site.has_review(&review.review_id) => {
                    log::info!(
                        "Review {} already attached to site {}",
                        review.review_id,
                        site.site_id
                    );
                    Ok((site.site_id, SubmitOutcome::Duplicate))
                }
                Some(site) => {
                    let update = SiteUpdate {
                        expected_total: site.total_reviews,
                        average_rating: site.average_with(review.rating),
                        review: review.clone(),
                    };
                    self.store
                        .update(&site.key(), &update)
                        .await
                        .map(|_| (site.site_id, SubmitOutcome::Updated))
                }
            };

            match written {
                Ok((site_id, outcome)) => {
                    log::info!(
                        "Review {} {:?} site {} ({})",
                        review.review_id,
                        outcome,
                        site_id,
                        request.hospital_name
                    );
                    return Ok(Submission {
                        site_id,
                        review_id: review.review_id,
                        outcome,
                    });
                }
                Err(e) if e.is_conflict() => {
                    log::warn!(
                        "Write conflict on attempt {}/{}: {}",
                        attempt,
                        self.max_attempts,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::conflict(
            canonical_id,
            format!("gave up after {} attempts", self.max_attempts),
        ))
    }
}

/// Choose the row a review applies to when the lookup found several.
///
/// Prefers the row keyed by the derived id, then the smallest site id.
fn pick_site(mut matches: Vec<RotationSite>, canonical_id: &str) -> Option<RotationSite> {
    if matches.len() > 1 {
        log::warn!(
            "{} rows share hospital '{}' under specialty '{}'",
            matches.len(),
            matches[0].hospital_name,
            matches[0].specialty
        );
    }

    if let Some(pos) = matches.iter().position(|s| s.site_id == canonical_id) {
        return Some(matches.swap_remove(pos));
    }
    matches.into_iter().min_by(|a, b| a.site_id.cmp(&b.site_id))
}
