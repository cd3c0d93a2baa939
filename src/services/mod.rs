//! Business services on top of the record store.
//!
//! - `submission`: attach a review to its site and update the aggregate
//! - `search`: resolve free-text and field-scoped searches
//! - `detail`: fetch one site by id
//! - `migrate`: rewrite legacy rows in the canonical shape

pub mod detail;
pub mod migrate;
pub mod search;
pub mod submission;

pub use detail::fetch_site;
pub use migrate::migrate_rows;
pub use search::SearchResolver;
pub use submission::{ReviewSubmitter, SubmitOutcome, Submission};
