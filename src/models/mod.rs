//! Typed request and response bodies.

pub mod request;
pub mod response;
