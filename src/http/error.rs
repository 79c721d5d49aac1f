//! Failures of the relay endpoints and their HTTP mapping.

use crate::{mail::DecodeError, models::response::RelayResponse, smtp::SmtpError};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
  /// Required environment is incomplete.
  #[error("Env vars not set up.")]
  Unconfigured,
  #[error("Wrong api_key.")]
  WrongApiKey,
  #[error("Invalid JSON body: {0}")]
  InvalidBody(#[from] serde_json::Error),
  #[error("Missing field: {0}")]
  MissingField(&'static str),
  #[error(transparent)]
  Decode(#[from] DecodeError),
  #[error(transparent)]
  Transmission(#[from] SmtpError),
}

impl RelayError {
  pub fn status(&self) -> StatusCode {
    match self {
      RelayError::Unconfigured => StatusCode::INTERNAL_SERVER_ERROR,
      RelayError::WrongApiKey => StatusCode::UNAUTHORIZED,
      RelayError::InvalidBody(_) | RelayError::MissingField(_) => StatusCode::BAD_REQUEST,
      RelayError::Decode(_) | RelayError::Transmission(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for RelayError {
  fn into_response(self) -> Response {
    (self.status(), Json(RelayResponse::failed(self.to_string()))).into_response()
  }
}
