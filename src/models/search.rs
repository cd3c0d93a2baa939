//! Search requests and result shapes.

use serde::{Deserialize, Serialize};

use super::RotationSite;

/// Independent optional field filters; supplied filters are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub hospital_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl SearchFilters {
    /// Whether no non-blank filter was supplied.
    pub fn is_empty(&self) -> bool {
        [&self.specialty, &self.hospital_name, &self.city, &self.state]
            .iter()
            .all(|f| f.as_deref().is_none_or(|v| v.trim().is_empty()))
    }
}

/// What the caller is searching for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Exact specialty first, then substring fallback over name and location
    Text(String),
    /// Field-scoped filters, optionally paginated (1-based page)
    Fields {
        filters: SearchFilters,
        page: Option<usize>,
    },
}

/// One page of results with its position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cut page `page` (1-based) of `page_size` rows out of `all`.
    pub fn slice(all: Vec<T>, page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = all.len();
        let total_pages = total.div_ceil(page_size);
        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        Self {
            items,
            page,
            total_pages,
            total,
        }
    }
}

/// Search output: a plain list, or a page when one was requested.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    List(Vec<RotationSite>),
    Paged(Page<RotationSite>),
}

impl SearchResults {
    /// Sites contained in this result.
    pub fn sites(&self) -> &[RotationSite] {
        match self {
            Self::List(sites) => sites,
            Self::Paged(page) => &page.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slice() {
        let page = Page::slice((1..=7).collect::<Vec<_>>(), 2, 3);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total, 7);

        let last = Page::slice((1..=7).collect::<Vec<_>>(), 3, 3);
        assert_eq!(last.items, vec![7]);
    }

    #[test]
    fn page_past_end_is_empty() {
        let page = Page::slice(vec![1, 2], 5, 25);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 5);
    }

    #[test]
    fn page_zero_is_first_page() {
        let page = Page::slice(vec![1, 2, 3], 0, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items, vec![1, 2]);
    }

    #[test]
    fn empty_input_has_no_pages() {
        let page: Page<u8> = Page::slice(Vec::new(), 1, 25);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn blank_filters_count_as_empty() {
        let filters = SearchFilters {
            city: Some("   ".into()),
            ..Default::default()
        };
        assert!(filters.is_empty());

        let filters = SearchFilters {
            state: Some("MA".into()),
            ..Default::default()
        };
        assert!(!filters.is_empty());
    }

    #[test]
    fn paged_results_serialize_with_metadata() {
        let results = SearchResults::Paged(Page::slice(Vec::new(), 1, 25));
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["page"], 1);
        assert_eq!(json["totalPages"], 0);
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
