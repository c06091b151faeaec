pub mod error;

pub use error::{GatewayError, ValidationError};
