//! Request handling at the gateway boundary.
//!
//! Requests and responses use the API Gateway proxy-integration shape. Every
//! outcome, including failures, leaves through [`build_response`] so the
//! client always receives a JSON body with CORS headers.
//!
//! | Route                                   | Operation |
//! |-----------------------------------------|-----------|
//! | `POST /submit-review`, `POST /rotations` | submit a review |
//! | `GET /search`                           | free-text (`q`) or field-scoped search |
//! | `GET /searchAll`                        | every site, paginated |
//! | `GET /rotation/{siteId}`                | one site with its reviews |
//! | `OPTIONS *`                             | CORS preflight |

pub mod response;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Config, SearchFilters, SearchQuery, SubmitRequest};
use crate::services::{ReviewSubmitter, SearchResolver, fetch_site};
use crate::storage::{self, SiteStore};

pub use response::{ApiResponse, build_response, message};

const SUBMIT_FAILED: &str = "Error submitting review";
const SEARCH_FAILED: &str = "Error performing search";
const DETAIL_FAILED: &str = "Error fetching rotation";

/// Proxy-integration request as delivered by the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(default)]
    pub http_method: String,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,

    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ApiRequest {
    fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    fn path_param(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }
}

/// Handlers wired to one store, built once per process.
pub struct App {
    store: Arc<dyn SiteStore>,
    submitter: ReviewSubmitter,
    resolver: SearchResolver,
    allowed_origin: String,
}

impl App {
    pub fn new(config: &Config, store: Arc<dyn SiteStore>) -> Self {
        Self {
            submitter: ReviewSubmitter::new(store.clone(), config.store.max_write_attempts),
            resolver: SearchResolver::new(store.clone(), config.api.page_size),
            store,
            allowed_origin: config.api.allowed_origin.clone(),
        }
    }

    /// Open the configured store and wire the handlers to it.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = storage::open(&config.store).await?;
        Ok(Self::new(config, store))
    }

    /// Route a request to its handler.
    pub async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let method = request.http_method.to_uppercase();
        let segments: Vec<&str> = request
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        log::debug!("{} {}", method, request.path);

        match (method.as_str(), segments.as_slice()) {
            ("OPTIONS", _) => self.respond(200, &json!({})),
            ("POST", ["submit-review"]) | ("POST", ["rotations"]) => self.submit(&request).await,
            ("GET", ["search"]) => self.search(&request).await,
            ("GET", ["searchAll"]) => self.search_all(&request).await,
            ("GET", ["rotation", site_id]) | ("GET", ["rotations", site_id]) => {
                let site_id = request.path_param("siteId").unwrap_or(site_id);
                self.detail(site_id).await
            }
            _ => self.respond(404, &message("Not found")),
        }
    }

    async fn submit(&self, request: &ApiRequest) -> ApiResponse {
        let parsed = parse_body::<SubmitRequest>(request);
        let result = match parsed {
            Ok(submit) => self.submitter.submit(submit).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(submission) => self.respond(
                200,
                &json!({
                    "message": "Review submitted successfully",
                    "siteId": submission.site_id,
                    "reviewId": submission.review_id,
                    "outcome": submission.outcome,
                }),
            ),
            Err(e) => self.failure(&e, SUBMIT_FAILED),
        }
    }

    async fn search(&self, request: &ApiRequest) -> ApiResponse {
        let result = match search_query(request) {
            Ok(query) => self.resolver.search(&query).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(results) => self.respond(200, &results),
            Err(e) => self.failure(&e, SEARCH_FAILED),
        }
    }

    /// Every site, one page at a time; `limit` may shrink the page.
    async fn search_all(&self, request: &ApiRequest) -> ApiResponse {
        let params = page_param(request).and_then(|page| Ok((page, limit_param(request)?)));
        let result = match params {
            Ok((page, limit)) => {
                self.resolver
                    .search_page(&SearchFilters::default(), page.unwrap_or(1), limit)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(results) => self.respond(200, &results),
            Err(e) => self.failure(&e, SEARCH_FAILED),
        }
    }

    async fn detail(&self, site_id: &str) -> ApiResponse {
        match fetch_site(self.store.as_ref(), site_id).await {
            Ok(site) => self.respond(200, &site),
            Err(e) => self.failure(&e, DETAIL_FAILED),
        }
    }

    fn respond<T: serde::Serialize + ?Sized>(&self, status: u16, body: &T) -> ApiResponse {
        build_response(status, body, &self.allowed_origin)
    }

    /// Map an error to its status; store failures get the generic message.
    fn failure(&self, err: &AppError, generic: &str) -> ApiResponse {
        match err {
            AppError::Validation(text) => {
                log::info!("Rejected request: {}", text);
                self.respond(400, &message(text))
            }
            AppError::NotFound(what) => {
                log::info!("Not found: {}", what);
                self.respond(404, &message("Rotation site not found"))
            }
            AppError::Conflict { .. } => {
                log::warn!("{}: {}", generic, err);
                self.respond(409, &message("Review could not be applied, please retry"))
            }
            _ => {
                log::error!("{}: {}", generic, err);
                self.respond(500, &message(generic))
            }
        }
    }
}

/// Decode a JSON body; any problem with it is the client's.
fn parse_body<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<T> {
    if request.is_base64_encoded {
        return Err(AppError::validation("Base64-encoded bodies are not supported"));
    }
    let body = request
        .body
        .as_deref()
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| AppError::validation("Request body is required"))?;

    serde_json::from_str(body)
        .map_err(|e| AppError::validation(format!("Malformed request body: {e}")))
}

fn page_param(request: &ApiRequest) -> Result<Option<usize>> {
    positive_param(request, "page")
}

fn limit_param(request: &ApiRequest) -> Result<Option<usize>> {
    positive_param(request, "limit")
}

fn positive_param(request: &ApiRequest, name: &str) -> Result<Option<usize>> {
    request
        .query_param(name)
        .map(|p| {
            p.trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AppError::validation(format!("{name} must be a positive integer")))
        })
        .transpose()
}

/// `q` selects free-text mode; otherwise the field filters apply.
fn search_query(request: &ApiRequest) -> Result<SearchQuery> {
    if let Some(term) = request.query_param("q") {
        return Ok(SearchQuery::Text(term.to_string()));
    }

    let field = |name: &str| request.query_param(name).map(str::to_string);
    Ok(SearchQuery::Fields {
        filters: SearchFilters {
            specialty: field("specialty"),
            hospital_name: field("hospitalName"),
            city: field("city"),
            state: field("state"),
        },
        page: page_param(request)?,
    })
}
