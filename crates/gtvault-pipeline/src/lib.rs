//! gtvault-pipeline: bounded request handling around the envelope codec
//!
//! Routes:
//!   POST /api/encrypt   `{"data": ...}` JSON in, envelope bytes out
//!   POST /api/decrypt   envelope bytes in, `{"success": true, "data": ...}` out
//!   GET  /healthz       liveness
//!
//! Each request passes content-type gating, a payload ceiling, and a soft
//! deadline before the codec runs. Failures are mapped onto the shared
//! [`gtvault_core::ErrorKind`] taxonomy and an HTTP status.

pub mod content;
pub mod deadline;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod state;

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

pub use deadline::Deadline;
pub use error::PipelineError;
pub use metrics::{Operation, PipelineMetrics};
pub use state::PipelineState;

/// Requests larger than this many times the payload ceiling are refused by
/// the transport before a handler sees them.
const TRANSPORT_LIMIT_FACTOR: usize = 2;

/// Build the API router.
pub fn router(state: PipelineState) -> Router {
    let transport_limit = state
        .limits()
        .max_payload_bytes
        .saturating_mul(TRANSPORT_LIMIT_FACTOR);

    Router::new()
        .route("/api/encrypt", post(handlers::encrypt))
        .route("/api/decrypt", post(handlers::decrypt))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(transport_limit))
        .layer(middleware::from_fn(handlers::stamp_request))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Outermost boundary: a panicking handler becomes a generic 500.
fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    PipelineError::internal("An unexpected error occurred").into_response()
}
