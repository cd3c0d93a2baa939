// src/lambda/mod.rs

//! AWS Lambda handler for the rotations API.
//!
//! API Gateway proxies every route to one function. The handler passes the
//! proxy event to [`App::dispatch`] and hands the envelope back unchanged.

use std::time::Instant;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use tracing::{field, info, instrument};

use crate::api::{ApiRequest, ApiResponse, App};

/// Main Lambda handler function.
///
/// Failures are already folded into the response envelope, so this never
/// returns `Err` for request-level problems.
#[instrument(skip(app, event), fields(method = field::Empty, path = field::Empty))]
pub async fn handler(
    app: &App,
    event: LambdaEvent<ApiRequest>,
) -> std::result::Result<ApiResponse, LambdaError> {
    let start = Instant::now();
    let (request, context) = event.into_parts();

    let span = tracing::Span::current();
    span.record("method", request.http_method.as_str());
    span.record("path", request.path.as_str());

    let response = app.dispatch(request).await;

    info!(
        request_id = %context.request_id,
        status = response.status_code,
        "Handled in {}ms",
        start.elapsed().as_millis()
    );
    Ok(response)
}
