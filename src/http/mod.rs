//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub mod error;
pub mod health;
pub mod sendmail;

/// Assemble the HTTP router with all routes.
///
/// Bodies are compressed when the client sends `Accept-Encoding`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sendmail", post(sendmail::sendmail))
        .route("/sendmail_dryrun", post(sendmail::sendmail_dryrun))
        .route("/health", get(health::health))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
