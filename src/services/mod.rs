pub mod api_service;

pub use api_service::{configure_routes, ApiService, ApiServiceState};
