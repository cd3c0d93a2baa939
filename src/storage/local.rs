//! Local filesystem store implementation.
//!
//! Keeps the whole table in one JSON document for development, the CLI and
//! tests. Production deployments should use `DynamoStore`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── sites.json    # {"<specialtyKey>#<siteId>": <row>, ...}
//! ```
//!
//! Mutations are serialized by an async mutex, so conditional writes are
//! atomic within one process. Separate processes sharing a directory are not
//! coordinated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{RotationSite, SiteKey, normalize};
use crate::storage::{PutMode, ScanFilter, SiteStore, SiteUpdate, item};
use crate::utils::write_atomic;

const TABLE_FILE: &str = "sites.json";

type Rows = BTreeMap<String, Value>;

/// Local filesystem store backend.
pub struct LocalStore {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn table_path(&self) -> PathBuf {
        self.root_dir.join(TABLE_FILE)
    }

    /// Read every row, or none if the table file doesn't exist yet.
    async fn load_rows(&self) -> Result<Rows> {
        match tokio::fs::read(self.table_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Rows::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn save_rows(&self, rows: &Rows) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(rows)?;
        write_atomic(&self.table_path(), &bytes).await
    }

    async fn decoded(&self) -> Result<Vec<RotationSite>> {
        self.load_rows()
            .await?
            .into_values()
            .map(item::from_item)
            .collect()
    }
}

#[async_trait]
impl SiteStore for LocalStore {
    async fn query(
        &self,
        specialty: &str,
        filter: Option<&ScanFilter>,
    ) -> Result<Vec<RotationSite>> {
        let partition = normalize(specialty);
        Ok(self
            .decoded()
            .await?
            .into_iter()
            .filter(|site| normalize(&site.specialty) == partition)
            .filter(|site| filter.is_none_or(|f| f.matches(site)))
            .collect())
    }

    async fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<RotationSite>> {
        Ok(self
            .decoded()
            .await?
            .into_iter()
            .filter(|site| filter.is_none_or(|f| f.matches(site)))
            .collect())
    }

    async fn put(&self, site: &RotationSite, mode: PutMode) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = site.key().to_string();
        let mut rows = self.load_rows().await?;

        if mode == PutMode::CreateOnly && rows.contains_key(&key) {
            return Err(AppError::conflict(key, "row already exists"));
        }

        rows.insert(key, Value::Object(item::to_item(site)?));
        self.save_rows(&rows).await
    }

    async fn update(&self, key: &SiteKey, update: &SiteUpdate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let row_key = key.to_string();
        let mut rows = self.load_rows().await?;

        let row = rows
            .remove(&row_key)
            .ok_or_else(|| AppError::conflict(&row_key, "row does not exist"))?;
        let mut site = item::from_item(row)?;

        if site.total_reviews != update.expected_total {
            return Err(AppError::conflict(
                row_key,
                format!(
                    "expected {} reviews, found {}",
                    update.expected_total, site.total_reviews
                ),
            ));
        }

        update.apply(&mut site);
        rows.insert(row_key, Value::Object(item::to_item(&site)?));
        self.save_rows(&rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Review};
    use crate::storage::{Condition, Field};
    use tempfile::TempDir;

    fn site(specialty: &str, hospital: &str, location: &str) -> RotationSite {
        RotationSite::from_first_review(
            specialty,
            hospital,
            Location::parse(location),
            Review::imported(format!("{hospital}-r1"), 4.0),
        )
    }

    #[tokio::test]
    async fn test_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        assert!(store.scan(None).await.unwrap().is_empty());
        assert!(store.query("cardiology", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_and_query() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store
            .put(&site("Cardiology", "St. Mary", "Boston, MA"), PutMode::CreateOnly)
            .await
            .unwrap();
        store
            .put(&site("Surgery", "St. Mary", "Boston, MA"), PutMode::CreateOnly)
            .await
            .unwrap();

        let cardiology = store.query("CARDIOLOGY", None).await.unwrap();
        assert_eq!(cardiology.len(), 1);
        assert_eq!(cardiology[0].specialty, "Cardiology");

        let filter = ScanFilter::all(vec![Condition::equals(Field::HospitalName, "st. mary")]);
        assert_eq!(store.query("surgery", Some(&filter)).await.unwrap().len(), 1);
        assert_eq!(store.scan(Some(&filter)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_only_conflicts_on_existing_key() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let site = site("Cardiology", "St. Mary", "Boston, MA");

        store.put(&site, PutMode::CreateOnly).await.unwrap();
        let err = store.put(&site, PutMode::CreateOnly).await.unwrap_err();
        assert!(err.is_conflict());

        store.put(&site, PutMode::Overwrite).await.unwrap();
        assert_eq!(store.scan(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_is_guarded_by_review_count() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let site = site("Cardiology", "St. Mary", "Boston, MA");
        store.put(&site, PutMode::CreateOnly).await.unwrap();

        let update = SiteUpdate {
            expected_total: 1,
            average_rating: 3.0,
            review: Review::imported("r2", 2.0),
        };
        store.update(&site.key(), &update).await.unwrap();

        // Same guard again is stale now
        let err = store.update(&site.key(), &update).await.unwrap_err();
        assert!(err.is_conflict());

        let stored = store.query("cardiology", None).await.unwrap();
        assert_eq!(stored[0].total_reviews, 2);
        assert_eq!(stored[0].average_rating, 3.0);
    }

    #[tokio::test]
    async fn update_of_missing_row_conflicts() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let update = SiteUpdate {
            expected_total: 0,
            average_rating: 4.0,
            review: Review::imported("r1", 4.0),
        };

        let err = store
            .update(&SiteKey::new("Cardiology", "nope"), &update)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn legacy_rows_are_readable() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(TABLE_FILE),
            r#"{
                "pediatrics#old-1": {
                    "siteId": "old-1",
                    "specialty": "Pediatrics",
                    "hospitalName": "Lurie Children's",
                    "location": "Chicago, IL",
                    "averageRating": 5,
                    "totalReviews": 1,
                    "reviews": ["legacy-review"]
                }
            }"#,
        )
        .unwrap();

        let store = LocalStore::new(tmp.path());
        let sites = store.query("pediatrics", None).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].location.state, "IL");
        assert!(sites[0].reviews[0].imported);
    }
}
