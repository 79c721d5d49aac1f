//! mailrelay library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration, shared state
//! - `http`: Axum router and handlers
//! - `smtp`: upstream SMTPS client (send and liveness probe)
//! - `mail`: payload decoding and message parsing
//! - `models`: request and response bodies
//! - `util`: tracing setup

pub mod app;
pub mod http;
pub mod mail;
pub mod models;
pub mod smtp;
pub mod util;
