// Modbus Explorer: HTTP to Modbus/TCP gateway

pub mod cli;
pub mod config;
pub mod gateway;
pub mod modbus;
pub mod output;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use gateway::{Gateway, ReadRequest, ReadResult, RegisterCategory, WriteRequest, WriteResult};
pub use modbus::{DeviceAddress, SessionConnector, SimulatedDevice, TcpConnector};
pub use output::{ConsoleFormatter, CsvFormatter, DataFormatter, HexFormatter, JsonFormatter};
pub use services::ApiService;
pub use utils::error::{GatewayError, ValidationError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
