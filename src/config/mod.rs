pub mod settings;

pub use settings::{ApiConfig, Config, LoggingConfig, DEFAULT_BASE_PATH};
