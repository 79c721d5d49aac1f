//! Body of `GET /health`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Healthy,
  Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status: HealthStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// `[code, reply]` of an EHLO that did not answer 250.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response: Option<(u16, String)>,
}

impl HealthResponse {
  pub fn healthy() -> Self {
    HealthResponse {
      status: HealthStatus::Healthy,
      error: None,
      response: None,
    }
  }

  pub fn unhealthy(error: impl Into<String>) -> Self {
    HealthResponse {
      status: HealthStatus::Unhealthy,
      error: Some(error.into()),
      response: None,
    }
  }
}
