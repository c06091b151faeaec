use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;

use super::category::{self, ReadOperation, WriteOperation};
use super::request::{ReadRequest, WriteRequest};
use super::shaper::{self, ReadResult, WriteResult};
use super::validator;
use crate::modbus::client::{DeviceAddress, ModbusSession, SessionConnector};
use crate::modbus::protocol::RawReadData;
use crate::utils::error::GatewayError;

/// One transaction per request: connect, one call, disconnect.
#[derive(Clone)]
pub struct Gateway {
    connector: Arc<dyn SessionConnector>,
}

impl Gateway {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self { connector }
    }

    pub async fn read_json(&self, body: &Value) -> Result<ReadResult, GatewayError> {
        let request = validator::validate_read(body).map_err(|e| {
            warn!("❌ Read request rejected: {}", e);
            GatewayError::from(e)
        })?;
        self.handle_read(&request).await
    }

    pub async fn write_json(&self, body: &Value) -> Result<WriteResult, GatewayError> {
        let request = validator::validate_write(body).map_err(|e| {
            warn!("❌ Write request rejected: {}", e);
            GatewayError::from(e)
        })?;
        self.handle_write(&request).await
    }

    pub async fn handle_read(&self, request: &ReadRequest) -> Result<ReadResult, GatewayError> {
        let operation = category::resolve_for_read(request.category.prefix() as i64)?;
        info!(
            "📊 Reading {} {}(s) from {} starting at address {} (function 0x{:02X})",
            request.count,
            request.category.name(),
            request.device,
            request.start_address,
            operation.function_code()
        );

        let mut session = self.open(&request.device).await?;
        let outcome = execute_read(session.as_mut(), operation, request.start_address, request.count).await;
        close(session, &request.device).await;

        match outcome {
            Ok(raw) => {
                debug!("✅ Received {} value(s) from {}", raw.len(), request.device);
                Ok(shaper::shape_read(raw, request.start_address))
            }
            Err(e) => {
                error!("❌ Read from {} failed: {}", request.device, e);
                Err(e)
            }
        }
    }

    pub async fn handle_write(&self, request: &WriteRequest) -> Result<WriteResult, GatewayError> {
        let operation = category::resolve_for_write(request.category.prefix() as i64)?;
        info!(
            "✏️  Writing {} {}(s) to {} starting at address {} (function 0x{:02X})",
            request.values.len(),
            request.category.name(),
            request.device,
            request.start_address,
            operation.function_code()
        );

        let mut session = self.open(&request.device).await?;
        let outcome = execute_write(session.as_mut(), operation, request.start_address, &request.values).await;
        close(session, &request.device).await;

        match outcome {
            Ok(()) => Ok(shaper::shape_write()),
            Err(e) => {
                error!("❌ Write to {} failed: {}", request.device, e);
                Err(e)
            }
        }
    }

    async fn open(&self, device: &DeviceAddress) -> Result<Box<dyn ModbusSession>, GatewayError> {
        let session = self.connector.connect(device).await.map_err(|e| {
            error!("❌ Could not open session to {}: {}", device, e);
            e
        })?;
        debug!("🔗 Session opened to {}", device);
        Ok(session)
    }
}

async fn execute_read(
    session: &mut dyn ModbusSession,
    operation: ReadOperation,
    start: u16,
    count: u16,
) -> Result<RawReadData, GatewayError> {
    match operation {
        ReadOperation::DiscreteInputs => session.read_discrete_inputs(start, count).await.map(RawReadData::Bits),
        ReadOperation::Coils => session.read_coils(start, count).await.map(RawReadData::Bits),
        ReadOperation::InputRegisters => session.read_input_registers(start, count).await.map(RawReadData::Words),
        ReadOperation::HoldingRegisters => session.read_holding_registers(start, count).await.map(RawReadData::Words),
    }
}

async fn execute_write(
    session: &mut dyn ModbusSession,
    operation: WriteOperation,
    start: u16,
    values: &[u16],
) -> Result<(), GatewayError> {
    match operation {
        WriteOperation::Coils => {
            let coils: Vec<bool> = values.iter().map(|v| *v != 0).collect();
            session.write_coils(start, &coils).await
        }
        WriteOperation::Registers => session.write_registers(start, values).await,
    }
}

/// Always runs, whatever the transaction outcome. A failed disconnect does
/// not replace the transaction result.
async fn close(mut session: Box<dyn ModbusSession>, device: &DeviceAddress) {
    match session.disconnect().await {
        Ok(()) => debug!("🔒 Session to {} closed", device),
        Err(e) => warn!("⚠️  Closing session to {} failed: {}", device, e),
    }
}
