//! JSON bodies accepted by the relay endpoints.
//!
//! `api_key` is not part of these types: handlers read it from the untyped
//! body first, so a mistyped payload field cannot pre-empt the key check.
//! Every field is optional; handlers decide what a missing one means.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct DryRunRequest {
    pub encoding: Option<String>,
    pub raw: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub envelope_from: Option<String>,
    pub envelope_to: Option<Recipients>,
    pub encoding: Option<String>,
    pub raw: Option<String>,
}

/// `envelope_to` as either one address or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Recipients::One(addr) => vec![addr],
            Recipients::Many(addrs) => addrs,
        }
    }
}
