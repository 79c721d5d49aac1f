//! Handlers for relaying and dry-running messages.
//!
//! Checks run in a fixed order: configuration, JSON syntax, API key, then the
//! typed payload. A rejected key never reaches decoding or the network.

use crate::{
  app::{AppState, config::Config},
  http::error::RelayError,
  mail::{Encoding, Message, decode},
  models::{
    request::{DryRunRequest, SendRequest},
    response::RelayResponse,
  },
  smtp::SmtpClient,
};
use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::header,
  response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

fn require_config(state: &AppState) -> Result<&Config, RelayError> {
  state.config.as_deref().ok_or(RelayError::Unconfigured)
}

// Plain equality; no constant-time comparison.
fn authorize(config: &Config, api_key: Option<&str>) -> Result<(), RelayError> {
  if config.accepts(api_key) {
    Ok(())
  } else {
    warn!("rejected request with wrong api_key");
    Err(RelayError::WrongApiKey)
  }
}

/// Parse the body as untyped JSON and check its `api_key`.
fn authorized_body(config: &Config, body: &[u8]) -> Result<Value, RelayError> {
  let value: Value = serde_json::from_slice(body)?;
  authorize(config, value.get("api_key").and_then(Value::as_str))?;
  Ok(value)
}

fn decode_message(raw: Option<String>, encoding: Option<&str>) -> Result<Message, RelayError> {
  let raw = raw.ok_or(RelayError::MissingField("raw"))?;
  let bytes = decode(&raw, Encoding::from_selector(encoding))?;
  Ok(Message::parse(&bytes)?)
}

/// `POST /sendmail_dryrun`: return the decoded message as plain text.
///
/// Bytes are returned as decoded; non-UTF-8 output drops the charset.
pub async fn sendmail_dryrun(
  State(state): State<AppState>,
  body: Bytes,
) -> Result<Response, RelayError> {
  let config = require_config(&state)?;
  let req: DryRunRequest = serde_json::from_value(authorized_body(config, &body)?)?;

  let message = decode_message(req.raw, req.encoding.as_deref())?;
  Ok(match String::from_utf8(message.to_text()) {
    Ok(text) => text.into_response(),
    Err(e) => ([(header::CONTENT_TYPE, "text/plain")], e.into_bytes()).into_response(),
  })
}

/// `POST /sendmail`: relay the decoded message to the upstream server.
pub async fn sendmail(
  State(state): State<AppState>,
  body: Bytes,
) -> Result<Json<RelayResponse>, RelayError> {
  let config = require_config(&state)?;
  let req: SendRequest = serde_json::from_value(authorized_body(config, &body)?)?;

  let message = decode_message(req.raw, req.encoding.as_deref())?;
  let from = req
    .envelope_from
    .ok_or(RelayError::MissingField("envelope_from"))?;
  let to = req
    .envelope_to
    .ok_or(RelayError::MissingField("envelope_to"))?
    .into_vec();

  let relay_id = Uuid::new_v4();
  info!(%relay_id, "relaying message from {} to {} recipient(s)", from, to.len());

  match SmtpClient::new(&config.smtp)
    .transmit(&from, &to, &message.to_wire())
    .await
  {
    Ok(()) => {
      info!(%relay_id, "message relayed");
      Ok(Json(RelayResponse::ok()))
    }
    Err(e) => {
      error!(%relay_id, "relay failed: {e}");
      Err(e.into())
    }
  }
}
