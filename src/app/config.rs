//! Process configuration loaded once at startup.
//!
//! The five required variables are all-or-nothing: if any one is missing (or
//! the port does not parse) the service runs unconfigured and every request
//! fails with the same error.

use crate::smtp::SmtpSettings;
use std::fmt;
use tracing::warn;

pub const SMTP_SERVER: &str = "SMTP_SERVER";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const API_KEY: &str = "API_KEY";
/// Optional PEM file trusted in addition to the built-in roots.
pub const SMTP_CA_FILE: &str = "SMTP_CA_FILE";

#[derive(Clone)]
pub struct Config {
  pub smtp: SmtpSettings,
  pub api_key: String,
}

impl Config {
  /// Read configuration from the process environment.
  pub fn from_env() -> Option<Self> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Build configuration from an arbitrary variable source.
  pub fn from_lookup<F>(lookup: F) -> Option<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let host = lookup(SMTP_SERVER)?;
    let port = lookup(SMTP_PORT)?;
    let username = lookup(SMTP_USER)?;
    let password = lookup(SMTP_PASSWORD)?;
    let api_key = lookup(API_KEY)?;

    let port = match port.trim().parse::<u16>() {
      Ok(p) => p,
      Err(e) => {
        warn!("{SMTP_PORT} is not a valid port ({port:?}): {e}");
        return None;
      }
    };

    let root_certificate = match lookup(SMTP_CA_FILE) {
      Some(path) => match std::fs::read_to_string(&path) {
        Ok(pem) => Some(pem),
        Err(e) => {
          warn!("cannot read {SMTP_CA_FILE} {path}: {e}");
          return None;
        }
      },
      None => None,
    };

    Some(Config {
      smtp: SmtpSettings {
        host,
        port,
        username,
        password,
        root_certificate,
      },
      api_key,
    })
  }

  /// Exact comparison against the configured key. A missing key never matches.
  pub fn accepts(&self, api_key: Option<&str>) -> bool {
    api_key == Some(self.api_key.as_str())
  }
}

impl fmt::Debug for Config {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Config")
      .field("smtp", &self.smtp)
      .field("api_key", &"<redacted>")
      .finish()
  }
}
