pub mod relay_request;

pub use relay_request::{DryRunRequest, Recipients, SendRequest};
