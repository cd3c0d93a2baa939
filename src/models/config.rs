//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Record store selection and write behavior
    #[serde(default)]
    pub store: StoreConfig,

    /// Handler boundary settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Sitemap generation settings
    #[serde(default)]
    pub sitemap: SitemapConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.store.table_name.trim().is_empty() {
            return Err(AppError::validation("store.table_name is empty"));
        }
        if self.store.max_write_attempts == 0 {
            return Err(AppError::validation("store.max_write_attempts must be > 0"));
        }
        if self.api.page_size == 0 {
            return Err(AppError::validation("api.page_size must be > 0"));
        }
        if self.api.allowed_origin.trim().is_empty() {
            return Err(AppError::validation("api.allowed_origin is empty"));
        }
        if url::Url::parse(&self.sitemap.base_url).is_err() {
            return Err(AppError::validation(format!(
                "sitemap.base_url is not a valid URL: {}",
                self.sitemap.base_url
            )));
        }
        if self.sitemap.extensions.is_empty() {
            return Err(AppError::validation("sitemap.extensions is empty"));
        }
        Ok(())
    }
}

/// Which record store backs the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON document table on the local filesystem
    #[default]
    Local,
    /// AWS DynamoDB table
    Dynamodb,
}

impl StoreBackend {
    /// Parse a backend name, as found in environment variables.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "dynamodb" | "dynamo" => Some(Self::Dynamodb),
            _ => None,
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to open
    #[serde(default)]
    pub backend: StoreBackend,

    /// Table holding RotationSite rows
    #[serde(default = "defaults::table_name")]
    pub table_name: String,

    /// Directory for the local backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: PathBuf,

    /// Attempts at a conditional write before a submission gives up
    #[serde(default = "defaults::max_write_attempts")]
    pub max_write_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            table_name: defaults::table_name(),
            local_dir: defaults::local_dir(),
            max_write_attempts: defaults::max_write_attempts(),
        }
    }
}

/// Handler boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Value of `Access-Control-Allow-Origin`
    #[serde(default = "defaults::allowed_origin")]
    pub allowed_origin: String,

    /// Rows per page in field-scoped search
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            allowed_origin: defaults::allowed_origin(),
            page_size: defaults::page_size(),
        }
    }
}

/// Sitemap generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Public site origin prefixed to every route
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Front-end source tree scanned for routes
    #[serde(default = "defaults::src_dir")]
    pub src_dir: PathBuf,

    /// Where the XML document is written
    #[serde(default = "defaults::output")]
    pub output: PathBuf,

    /// File extensions scanned
    #[serde(default = "defaults::extensions")]
    pub extensions: Vec<String>,

    /// Static-site bucket the sitemap is published to
    #[serde(default)]
    pub bucket: Option<String>,

    /// Object key inside the bucket
    #[serde(default = "defaults::object_key")]
    pub object_key: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            src_dir: defaults::src_dir(),
            output: defaults::output(),
            extensions: defaults::extensions(),
            bucket: None,
            object_key: defaults::object_key(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn table_name() -> String {
        "RotationSites".into()
    }
    pub fn local_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn max_write_attempts() -> u32 {
        5
    }

    pub fn allowed_origin() -> String {
        "*".into()
    }
    pub fn page_size() -> usize {
        25
    }

    pub fn base_url() -> String {
        "https://rotationsinfo.com".into()
    }
    pub fn src_dir() -> PathBuf {
        PathBuf::from("src")
    }
    pub fn output() -> PathBuf {
        PathBuf::from("public/sitemap.xml")
    }
    pub fn extensions() -> Vec<String> {
        vec!["js".into(), "jsx".into(), "ts".into(), "tsx".into()]
    }
    pub fn object_key() -> String {
        "sitemap.xml".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
