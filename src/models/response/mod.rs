pub mod health_response;
pub mod relay_response;

pub use health_response::HealthResponse;
pub use relay_response::RelayResponse;
