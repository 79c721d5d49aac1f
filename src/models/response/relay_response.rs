//! `{"success": 0|1, "error": ...}` body of the relay endpoints.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RelayResponse {
  pub success: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl RelayResponse {
  pub fn ok() -> Self {
    RelayResponse {
      success: 1,
      error: None,
    }
  }

  pub fn failed(error: impl Into<String>) -> Self {
    RelayResponse {
      success: 0,
      error: Some(error.into()),
    }
  }
}
