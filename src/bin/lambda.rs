//! AWS Lambda entry point for the rotations API.
//!
//! Deploy with `cargo lambda build --release --features lambda`.

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotations::api::{ApiRequest, App};
use rotations::{config, lambda};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::from_env()?;
    let app = Arc::new(App::from_config(&config).await?);
    info!(
        "Rotations API starting (table {}, backend {:?})",
        config.store.table_name, config.store.backend
    );

    lambda_runtime::run(service_fn(move |event: LambdaEvent<ApiRequest>| {
        let app = app.clone();
        async move { lambda::handler(&app, event).await }
    }))
    .await
}
