pub mod client;
pub mod protocol;
pub mod simulator;

pub use client::{DeviceAddress, ModbusSession, SessionConnector, TcpConnector};
pub use protocol::RawReadData;
pub use simulator::{SimulatedDevice, SimulatedFault};
