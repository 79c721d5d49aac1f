//! Payload decoding and message parsing.

mod message;

pub use message::Message;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;

/// Supported `encoding` selectors.
///
/// Only `"b64"` is recognised. Anything else, including `"string"`, an empty
/// string, a missing field or an unknown token, passes the payload through
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
  Base64,
  PassThrough,
}

impl Encoding {
  pub fn from_selector(selector: Option<&str>) -> Self {
    match selector {
      Some("b64") => Encoding::Base64,
      _ => Encoding::PassThrough,
    }
  }
}

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("invalid base64 payload: {0}")]
  Base64(#[from] base64::DecodeError),
  #[error("unparsable message: {0}")]
  Parse(#[from] mailparse::MailParseError),
}

/// Decode `raw` according to `encoding`.
pub fn decode(raw: &str, encoding: Encoding) -> Result<Vec<u8>, DecodeError> {
  match encoding {
    Encoding::Base64 => {
      // MIME tools wrap base64 at 76 columns
      let compact: String = raw.split_ascii_whitespace().collect();
      Ok(B64.decode(compact)?)
    }
    Encoding::PassThrough => Ok(raw.as_bytes().to_vec()),
  }
}
