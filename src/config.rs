// src/config.rs

//! Configuration loading utilities.
//!
//! The CLI reads a TOML file; the Lambda function has no file to read and
//! builds its configuration from defaults plus environment variables.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{Config, StoreBackend};

/// Load configuration from a TOML file, then apply environment overrides.
pub fn load(path: &Path) -> Result<Config> {
    let mut config = Config::load_or_default(path);
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Build configuration suitable for the Lambda environment.
///
/// The backend defaults to DynamoDB here.
pub fn from_env() -> Result<Config> {
    let mut config = Config::default();
    config.store.backend = StoreBackend::Dynamodb;
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Override configuration values from environment-style lookups.
///
/// - `STORE_BACKEND`: `local` or `dynamodb`
/// - `TABLE_NAME`: table holding site rows
/// - `LOCAL_STORE_DIR`: directory for the local backend
/// - `MAX_WRITE_ATTEMPTS`: conditional write attempts per submission
/// - `ALLOWED_ORIGIN`: CORS origin
/// - `PAGE_SIZE`: rows per search page
/// - `SITEMAP_BASE_URL`, `SITEMAP_BUCKET`: sitemap publishing
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(backend) = lookup("STORE_BACKEND") {
        config.store.backend = StoreBackend::parse(&backend)
            .ok_or_else(|| AppError::config(format!("Unknown STORE_BACKEND: {backend}")))?;
    }

    if let Some(table) = lookup("TABLE_NAME") {
        config.store.table_name = table;
    }

    if let Some(dir) = lookup("LOCAL_STORE_DIR") {
        config.store.local_dir = PathBuf::from(dir);
    }

    if let Some(attempts) = lookup("MAX_WRITE_ATTEMPTS") {
        if let Ok(n) = attempts.parse() {
            config.store.max_write_attempts = n;
        }
    }

    if let Some(origin) = lookup("ALLOWED_ORIGIN") {
        config.api.allowed_origin = origin;
    }

    if let Some(size) = lookup("PAGE_SIZE") {
        if let Ok(n) = size.parse() {
            config.api.page_size = n;
        }
    }

    if let Some(base_url) = lookup("SITEMAP_BASE_URL") {
        config.sitemap.base_url = base_url;
    }

    if let Some(bucket) = lookup("SITEMAP_BUCKET") {
        config.sitemap.bucket = Some(bucket);
    }

    Ok(())
}
