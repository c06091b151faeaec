use super::category::RegisterCategory;
use crate::modbus::client::DeviceAddress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub device: DeviceAddress,
    pub category: RegisterCategory,
    pub start_address: u16,
    pub count: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub device: DeviceAddress,
    pub category: RegisterCategory,
    pub start_address: u16,
    // Coil values are 0 or 1.
    pub values: Vec<u16>,
}
