//! Search resolution over the site store.
//!
//! Free-text terms try the specialty partition first and fall back to a
//! filtered scan only when the partition is empty. Field-scoped searches
//! always scan with the supplied filters AND-ed together. Matching is
//! case-insensitive substring containment; the resolver imposes no order.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Page, RotationSite, SearchFilters, SearchQuery, SearchResults, normalize};
use crate::storage::{Condition, Field, ScanFilter, SiteStore};

/// Resolves search queries against a store.
pub struct SearchResolver {
    store: Arc<dyn SiteStore>,
    page_size: usize,
}

impl SearchResolver {
    pub fn new(store: Arc<dyn SiteStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Run a query in whichever mode it asks for.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        match query {
            SearchQuery::Text(term) => self.search_text(term).await.map(SearchResults::List),
            SearchQuery::Fields { filters, page } => match page {
                Some(page) => self
                    .search_page(filters, *page, None)
                    .await
                    .map(SearchResults::Paged),
                None => self.search_fields(filters).await.map(SearchResults::List),
            },
        }
    }

    /// Exact specialty match, else substring match on name or location.
    ///
    /// A blank term matches nothing.
    pub async fn search_text(&self, term: &str) -> Result<Vec<RotationSite>> {
        let term = normalize(term);
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let exact = self.store.query(&term, None).await?;
        if !exact.is_empty() {
            log::debug!("'{}' matched {} sites by specialty", term, exact.len());
            return Ok(exact);
        }

        let fallback = ScanFilter::any(vec![
            Condition::contains(Field::HospitalName, &term),
            Condition::contains(Field::Location, &term),
            Condition::contains(Field::City, &term),
            Condition::contains(Field::State, &term),
        ]);
        let found = self.store.scan(Some(&fallback)).await?;
        log::debug!("'{}' matched {} sites by fallback scan", term, found.len());
        Ok(found)
    }

    /// Scan with every supplied filter; no filters returns every site.
    pub async fn search_fields(&self, filters: &SearchFilters) -> Result<Vec<RotationSite>> {
        if filters.is_empty() {
            return self.store.scan(None).await;
        }

        let conditions: Vec<Condition> = [
            (Field::Specialty, &filters.specialty),
            (Field::HospitalName, &filters.hospital_name),
            (Field::City, &filters.city),
            (Field::State, &filters.state),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| Condition::contains(field, v))
        })
        .collect();

        self.store.scan(Some(&ScanFilter::all(conditions))).await
    }

    /// One page of a field-scoped search.
    ///
    /// `limit` can shrink the page below the configured size, never grow it.
    pub async fn search_page(
        &self,
        filters: &SearchFilters,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Page<RotationSite>> {
        let page_size = limit
            .filter(|n| *n > 0)
            .map_or(self.page_size, |n| n.min(self.page_size));
        let sites = self.search_fields(filters).await?;
        Ok(Page::slice(sites, page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Location, Review, SiteKey};
    use crate::storage::{LocalStore, PutMode, SiteUpdate};

    /// Local store that counts partition lookups and scans.
    struct CountingStore {
        inner: LocalStore,
        queries: AtomicUsize,
        scans: AtomicUsize,
    }

    #[async_trait]
    impl SiteStore for CountingStore {
        async fn query(
            &self,
            specialty: &str,
            filter: Option<&ScanFilter>,
        ) -> Result<Vec<RotationSite>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.query(specialty, filter).await
        }

        async fn scan(&self, filter: Option<&ScanFilter>) -> Result<Vec<RotationSite>> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.scan(filter).await
        }

        async fn put(&self, site: &RotationSite, mode: PutMode) -> Result<()> {
            self.inner.put(site, mode).await
        }

        async fn update(&self, key: &SiteKey, update: &SiteUpdate) -> Result<()> {
            self.inner.update(key, update).await
        }
    }

    async fn seeded(tmp: &TempDir) -> Arc<CountingStore> {
        let store = Arc::new(CountingStore {
            inner: LocalStore::new(tmp.path()),
            queries: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
        });

        for (specialty, hospital, location) in [
            ("Cardiology", "St. Mary", "Boston, MA"),
            ("Surgery", "Mercy General", "Sacramento, CA"),
            ("Pediatrics", "Boston Children's", "Boston, MA"),
            ("Internal Medicine", "Cardio Care Clinic", "Austin, TX"),
        ] {
            let site = RotationSite::from_first_review(
                specialty,
                hospital,
                Location::parse(location),
                Review::imported(format!("{hospital}-r1"), 4.0),
            );
            store.put(&site, PutMode::CreateOnly).await.unwrap();
        }
        store
    }

    fn hospitals(sites: &[RotationSite]) -> Vec<String> {
        let mut names: Vec<String> = sites.iter().map(|s| s.hospital_name.clone()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn exact_specialty_skips_fallback() {
        let tmp = TempDir::new().unwrap();
        let store = seeded(&tmp).await;
        let resolver = SearchResolver::new(store.clone(), 25);

        let sites = resolver.search_text("cardiology").await.unwrap();
        assert_eq!(hospitals(&sites), vec!["St. Mary"]);
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
        assert_eq!(store.scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_matches_hospital_substring() {
        let tmp = TempDir::new().unwrap();
        let store = seeded(&tmp).await;
        let resolver = SearchResolver::new(store.clone(), 25);

        let sites = resolver.search_text("st. mary").await.unwrap();
        assert_eq!(hospitals(&sites), vec!["St. Mary"]);
        assert_eq!(store.scans.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_matches_location() {
        let tmp = TempDir::new().unwrap();
        let resolver = SearchResolver::new(seeded(&tmp).await, 25);

        let sites = resolver.search_text("boston").await.unwrap();
        assert_eq!(hospitals(&sites), vec!["Boston Children's", "St. Mary"]);

        let sites = resolver.search_text("tx").await.unwrap();
        assert_eq!(hospitals(&sites), vec!["Cardio Care Clinic"]);
    }

    #[tokio::test]
    async fn case_does_not_change_results() {
        let tmp = TempDir::new().unwrap();
        let resolver = SearchResolver::new(seeded(&tmp).await, 25);

        let lower = resolver.search_text("cardio").await.unwrap();
        let upper = resolver.search_text("CARDIO").await.unwrap();
        assert_eq!(lower, upper);
        assert_eq!(hospitals(&lower), vec!["Cardio Care Clinic"]);
    }

    #[tokio::test]
    async fn repeated_search_is_stable() {
        let tmp = TempDir::new().unwrap();
        let resolver = SearchResolver::new(seeded(&tmp).await, 25);

        let first = resolver.search_text("boston").await.unwrap();
        let second = resolver.search_text("boston").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn blank_or_unmatched_term_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = seeded(&tmp).await;
        let resolver = SearchResolver::new(store.clone(), 25);

        assert!(resolver.search_text("   ").await.unwrap().is_empty());
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);

        assert!(resolver.search_text("dermatology").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn field_filters_are_and_ed() {
        let tmp = TempDir::new().unwrap();
        let resolver = SearchResolver::new(seeded(&tmp).await, 25);

        let filters = SearchFilters {
            city: Some("boston".into()),
            specialty: Some("pedi".into()),
            ..Default::default()
        };
        let sites = resolver.search_fields(&filters).await.unwrap();
        assert_eq!(hospitals(&sites), vec!["Boston Children's"]);

        let all = resolver.search_fields(&SearchFilters::default()).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn paged_field_search() {
        let tmp = TempDir::new().unwrap();
        let resolver = SearchResolver::new(seeded(&tmp).await, 3);

        let query = SearchQuery::Fields {
            filters: SearchFilters::default(),
            page: Some(2),
        };
        match resolver.search(&query).await.unwrap() {
            SearchResults::Paged(page) => {
                assert_eq!(page.total, 4);
                assert_eq!(page.total_pages, 2);
                assert_eq!(page.items.len(), 1);
            }
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_filters_scan_everything() {
        let tmp = TempDir::new().unwrap();
        let store = seeded(&tmp).await;
        let resolver = SearchResolver::new(store.clone(), 25);

        let filters = SearchFilters {
            city: Some("   ".into()),
            ..Default::default()
        };
        assert!(filters.is_empty());
        assert_eq!(resolver.search_fields(&filters).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn limit_shrinks_but_never_grows_pages() {
        let tmp = TempDir::new().unwrap();
        let resolver = SearchResolver::new(seeded(&tmp).await, 3);
        let filters = SearchFilters::default();

        let page = resolver.search_page(&filters, 1, Some(2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);

        let page = resolver.search_page(&filters, 1, Some(100)).await.unwrap();
        assert_eq!(page.items.len(), 3);

        let page = resolver.search_page(&filters, 1, Some(0)).await.unwrap();
        assert_eq!(page.items.len(), 3);
    }
}
