//! Rotations CLI
//!
//! Local execution entry point. For AWS Lambda, use `rotations-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rotations::{
    config,
    error::{AppError, Result},
    models::{SearchFilters, SearchQuery, SubmitRequest},
    services::{ReviewSubmitter, SearchResolver, fetch_site, migrate_rows},
    sitemap, storage,
};

/// Rotations - clinical rotation site reviews
#[derive(Parser, Debug)]
#[command(
    name = "rotations",
    version,
    about = "Review aggregation backend for clinical rotation sites"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "rotations.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a review from a JSON file shaped like the API request body
    Submit {
        /// Path to the request JSON
        file: PathBuf,
    },

    /// Search sites by free text or by field
    Search {
        /// Free-text term (specialty, then hospital or location)
        #[arg(short, long)]
        q: Option<String>,

        #[arg(long)]
        specialty: Option<String>,

        #[arg(long)]
        hospital: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,

        /// Return one page with pagination metadata
        #[arg(long)]
        page: Option<usize>,
    },

    /// Show one site with its reviews
    Show {
        site_id: String,
    },

    /// Rewrite legacy rows in the current schema
    Migrate,

    /// Generate sitemap.xml from the front-end sources
    Sitemap {
        /// Also upload the sitemap to the configured bucket
        #[cfg(feature = "s3")]
        #[arg(long)]
        publish: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging at the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug",
        (Ok(config), false) => config.logging.level.as_str(),
        (Err(_), false) => "info",
    };
    init_logging(level);

    let config = loaded.inspect_err(|e| log::error!("Config validation failed: {}", e))?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Submit { file } => {
            let body = std::fs::read_to_string(&file)?;
            let request: SubmitRequest = serde_json::from_str(&body)
                .map_err(|e| AppError::validation(format!("{}: {e}", file.display())))?;

            let store = storage::open(&config.store).await?;
            let submitter = ReviewSubmitter::new(store, config.store.max_write_attempts);
            let submission = submitter.submit(request).await?;
            print_json(&submission)?;
        }

        Command::Search {
            q,
            specialty,
            hospital,
            city,
            state,
            page,
        } => {
            let query = match q {
                Some(term) => SearchQuery::Text(term),
                None => SearchQuery::Fields {
                    filters: SearchFilters {
                        specialty,
                        hospital_name: hospital,
                        city,
                        state,
                    },
                    page,
                },
            };

            let store = storage::open(&config.store).await?;
            let resolver = SearchResolver::new(store, config.api.page_size);
            let results = resolver.search(&query).await?;
            log::info!("{} sites matched", results.sites().len());
            print_json(&results)?;
        }

        Command::Show { site_id } => {
            let store = storage::open(&config.store).await?;
            let site = fetch_site(store.as_ref(), &site_id).await?;
            print_json(&site)?;
        }

        Command::Migrate => {
            let store = storage::open(&config.store).await?;
            let count = migrate_rows(store.as_ref()).await?;
            log::info!("Rewrote {} rows", count);
        }

        #[cfg(feature = "s3")]
        Command::Sitemap { publish } => {
            let written = sitemap::write_sitemap(&config.sitemap)
                .await
                .inspect_err(|e| log::error!("Sitemap generation failed: {}", e))?;
            if publish {
                sitemap::publish(&config.sitemap, &written)
                    .await
                    .inspect_err(|e| log::error!("Sitemap upload failed: {}", e))?;
            }
        }

        #[cfg(not(feature = "s3"))]
        Command::Sitemap { .. } => {
            sitemap::write_sitemap(&config.sitemap)
                .await
                .inspect_err(|e| log::error!("Sitemap generation failed: {}", e))?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!(
                "✓ Store: {:?} (table {}, {} write attempts)",
                config.store.backend,
                config.store.table_name,
                config.store.max_write_attempts
            );
            log::info!(
                "✓ API: origin {}, page size {}",
                config.api.allowed_origin,
                config.api.page_size
            );
            log::info!(
                "✓ Sitemap: {} from {}",
                config.sitemap.base_url,
                config.sitemap.src_dir.display()
            );
            log::info!("All validations passed!");
        }
    }

    Ok(())
}
