use async_trait::async_trait;
use log::{debug, error};
use std::fmt;
use std::net::SocketAddr;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

use crate::utils::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub ip: String,
    pub port: u16,
    pub slave_id: u8,
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (slave {})", self.ip, self.port, self.slave_id)
    }
}

/// One open Modbus session. Exception responses come back as
/// `GatewayError::Protocol`, everything else as `GatewayError::Transport`.
#[async_trait]
pub trait ModbusSession: Send {
    async fn read_discrete_inputs(&mut self, start: u16, count: u16) -> Result<Vec<bool>, GatewayError>;

    async fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, GatewayError>;

    async fn read_input_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, GatewayError>;

    async fn read_holding_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, GatewayError>;

    async fn write_coils(&mut self, start: u16, values: &[bool]) -> Result<(), GatewayError>;

    async fn write_registers(&mut self, start: u16, values: &[u16]) -> Result<(), GatewayError>;

    async fn disconnect(&mut self) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, device: &DeviceAddress) -> Result<Box<dyn ModbusSession>, GatewayError>;
}

#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }

    async fn resolve(device: &DeviceAddress) -> Result<SocketAddr, GatewayError> {
        let mut addrs = tokio::net::lookup_host((device.ip.as_str(), device.port))
            .await
            .map_err(|e| {
                GatewayError::Transport(format!("Cannot resolve {}:{}: {}", device.ip, device.port, e))
            })?;

        addrs.next().ok_or_else(|| {
            GatewayError::Transport(format!("No address found for {}:{}", device.ip, device.port))
        })
    }
}

#[async_trait]
impl SessionConnector for TcpConnector {
    async fn connect(&self, device: &DeviceAddress) -> Result<Box<dyn ModbusSession>, GatewayError> {
        let socket_addr = Self::resolve(device).await?;
        debug!("🔌 Connecting to Modbus/TCP device {}", device);

        let ctx = tcp::connect_slave(socket_addr, Slave(device.slave_id))
            .await
            .map_err(|e| {
                error!("❌ Failed to connect to {}: {}", device, e);
                GatewayError::Transport(format!("Failed to connect to {}: {}", socket_addr, e))
            })?;

        Ok(Box::new(TcpSession { ctx }))
    }
}

pub struct TcpSession {
    ctx: Context,
}

#[async_trait]
impl ModbusSession for TcpSession {
    async fn read_discrete_inputs(&mut self, start: u16, count: u16) -> Result<Vec<bool>, GatewayError> {
        Ok(self.ctx.read_discrete_inputs(start, count).await??)
    }

    async fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, GatewayError> {
        Ok(self.ctx.read_coils(start, count).await??)
    }

    async fn read_input_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, GatewayError> {
        Ok(self.ctx.read_input_registers(start, count).await??)
    }

    async fn read_holding_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, GatewayError> {
        Ok(self.ctx.read_holding_registers(start, count).await??)
    }

    async fn write_coils(&mut self, start: u16, values: &[bool]) -> Result<(), GatewayError> {
        Ok(self.ctx.write_multiple_coils(start, values).await??)
    }

    async fn write_registers(&mut self, start: u16, values: &[u16]) -> Result<(), GatewayError> {
        Ok(self.ctx.write_multiple_registers(start, values).await??)
    }

    async fn disconnect(&mut self) -> Result<(), GatewayError> {
        self.ctx.disconnect().await?;
        Ok(())
    }
}
