//! Single-site lookup by identifier.

use crate::error::{AppError, Result};
use crate::models::RotationSite;
use crate::storage::{Condition, Field, ScanFilter, SiteStore};

/// Fetch one site with its embedded reviews.
///
/// Only the sort key is known here, so this is a filtered scan.
pub async fn fetch_site(store: &dyn SiteStore, site_id: &str) -> Result<RotationSite> {
    let site_id = site_id.trim();
    if site_id.is_empty() {
        return Err(AppError::validation("siteId is required"));
    }

    let filter = ScanFilter::all(vec![Condition::equals(Field::SiteId, site_id)]);
    store
        .scan(Some(&filter))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(format!("site {site_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Review};
    use crate::storage::{LocalStore, PutMode};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_site() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let site = RotationSite::from_first_review(
            "Cardiology",
            "St. Mary",
            Location::parse("Boston, MA"),
            Review::imported("r1", 4.0),
        );
        store.put(&site, PutMode::CreateOnly).await.unwrap();

        let found = fetch_site(&store, &site.site_id).await.unwrap();
        assert_eq!(found, site);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let err = fetch_site(&store, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = fetch_site(&store, " ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
