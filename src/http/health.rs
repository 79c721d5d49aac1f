//! Liveness endpoint backed by a live SMTP probe.

use crate::{
  app::AppState,
  http::error::RelayError,
  models::response::HealthResponse,
  smtp::{SmtpClient, SmtpError},
};
use axum::{Json, extract::State, http::StatusCode};
use tracing::warn;

pub const UNEXPECTED_RESPONSE: &str = "SMTP server returned unexpected response.";

/// `GET /health`: one real connection per call, nothing cached.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
  let Some(config) = state.config.as_deref() else {
    return unhealthy(HealthResponse::unhealthy(RelayError::Unconfigured.to_string()));
  };

  match SmtpClient::new(&config.smtp).probe().await {
    Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy())),
    Err(SmtpError::UnexpectedResponse { code, reply }) => {
      warn!("health probe: EHLO answered {code}");
      let mut body = HealthResponse::unhealthy(UNEXPECTED_RESPONSE);
      body.response = Some((code, reply));
      unhealthy(body)
    }
    Err(e) => {
      warn!("health probe failed: {e}");
      unhealthy(HealthResponse::unhealthy(format!(
        "Failed to reach SMTP server: {e}"
      )))
    }
  }
}

fn unhealthy(body: HealthResponse) -> (StatusCode, Json<HealthResponse>) {
  (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}
