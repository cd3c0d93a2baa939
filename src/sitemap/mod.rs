//! Sitemap generation for the public front end.
//!
//! Routes are discovered by scanning the front-end sources, rendered as
//! sitemap XML and written next to the other static assets. With the `s3`
//! feature the result can also be published to the static-site bucket.

mod extract;
mod generate;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::Utc;

use crate::error::Result;
use crate::models::SitemapConfig;
use crate::utils::write_atomic;

pub use extract::{RouteExtractor, extract_routes};
pub use generate::generate_sitemap;

/// A rendered sitemap and where it was written.
#[derive(Debug, Clone)]
pub struct Sitemap {
    pub routes: BTreeSet<String>,
    pub xml: String,
    pub path: PathBuf,
}

/// Extract routes, render them and write the sitemap file atomically.
pub async fn write_sitemap(config: &SitemapConfig) -> Result<Sitemap> {
    let base = url::Url::parse(&config.base_url)?;
    let routes = extract_routes(&config.src_dir, &config.extensions)?;
    log::info!(
        "Found {} routes under {}",
        routes.len(),
        config.src_dir.display()
    );

    let xml = generate_sitemap(base.as_str(), &routes, Utc::now());

    let path = config.output.clone();
    write_atomic(&path, xml.as_bytes()).await?;

    log::info!("Sitemap written to {}", path.display());
    Ok(Sitemap { routes, xml, path })
}

/// Upload a rendered sitemap to the configured bucket.
#[cfg(feature = "s3")]
pub async fn publish(config: &SitemapConfig, sitemap: &Sitemap) -> Result<()> {
    use crate::error::AppError;
    use crate::storage::s3::S3Objects;

    let bucket = config
        .bucket
        .as_deref()
        .ok_or_else(|| AppError::config("sitemap.bucket is not set"))?;

    S3Objects::from_env(bucket)
        .await?
        .write_bytes(
            &config.object_key,
            sitemap.xml.clone().into_bytes(),
            "application/xml",
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_sitemap_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(
            src.join("App.js"),
            r#"<Route path="/rotation/:siteId" /><Route path="/search" />"#,
        )
        .unwrap();

        let config = SitemapConfig {
            src_dir: src,
            output: tmp.path().join("public/sitemap.xml"),
            ..Default::default()
        };

        let sitemap = write_sitemap(&config).await.unwrap();
        assert_eq!(sitemap.routes.len(), 3);

        let written = std::fs::read_to_string(&config.output).unwrap();
        assert_eq!(written, sitemap.xml);
        assert!(written.contains("<loc>https://rotationsinfo.com/rotation</loc>"));
        assert!(!tmp.path().join("public/sitemap.tmp").exists());
    }

    #[tokio::test]
    async fn missing_source_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let config = SitemapConfig {
            src_dir: tmp.path().join("nope"),
            output: tmp.path().join("sitemap.xml"),
            ..Default::default()
        };

        assert!(write_sitemap(&config).await.is_err());
        assert!(!config.output.exists());
    }
}
