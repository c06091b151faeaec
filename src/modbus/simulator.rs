// In-memory Modbus device, used by tests and `serve --simulate`

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_modbus::ExceptionCode;

use super::client::{DeviceAddress, ModbusSession, SessionConnector};
use crate::utils::error::GatewayError;

pub const DEFAULT_TABLE_SIZE: usize = 10_000;

/// One-shot failure consumed by the next connect or transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedFault {
    ConnectionRefused,
    DropConnection,
}

#[derive(Debug)]
struct DeviceImage {
    discrete_inputs: Vec<bool>,
    coils: Vec<bool>,
    input_registers: Vec<u16>,
    holding_registers: Vec<u16>,
}

impl DeviceImage {
    fn new(size: usize) -> Self {
        Self {
            discrete_inputs: vec![false; size],
            coils: vec![false; size],
            input_registers: vec![0; size],
            holding_registers: vec![0; size],
        }
    }
}

#[derive(Debug, Default)]
struct SessionStats {
    connect_attempts: AtomicUsize,
    open_sessions: AtomicUsize,
    transactions: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    image: Arc<Mutex<DeviceImage>>,
    fault: Arc<Mutex<Option<SimulatedFault>>>,
    stats: Arc<SessionStats>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_SIZE)
    }
}

impl SimulatedDevice {
    pub fn new(table_size: usize) -> Self {
        Self {
            image: Arc::new(Mutex::new(DeviceImage::new(table_size))),
            fault: Arc::new(Mutex::new(None)),
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Device preloaded with a recognisable pattern, used by `serve --simulate`.
    pub fn with_demo_data() -> Self {
        let device = Self::default();
        if let Ok(mut image) = device.image.lock() {
            for addr in 0..16 {
                image.discrete_inputs[addr] = addr % 2 == 0;
                image.coils[addr] = addr % 3 == 0;
                image.input_registers[addr] = (addr as u16) * 100;
                image.holding_registers[addr] = 1000 + addr as u16;
            }
        }
        device
    }

    pub fn set_discrete_inputs(&self, start: u16, values: &[bool]) -> Result<(), GatewayError> {
        let mut image = self.lock_image()?;
        write_table(&mut image.discrete_inputs, start, values)?;
        Ok(())
    }

    pub fn set_input_registers(&self, start: u16, values: &[u16]) -> Result<(), GatewayError> {
        let mut image = self.lock_image()?;
        write_table(&mut image.input_registers, start, values)?;
        Ok(())
    }

    pub fn set_holding_registers(&self, start: u16, values: &[u16]) -> Result<(), GatewayError> {
        let mut image = self.lock_image()?;
        write_table(&mut image.holding_registers, start, values)?;
        Ok(())
    }

    pub fn inject_fault(&self, fault: SimulatedFault) {
        if let Ok(mut slot) = self.fault.lock() {
            *slot = Some(fault);
        }
    }

    pub fn connect_attempts(&self) -> usize {
        self.stats.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.stats.open_sessions.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.stats.transactions.load(Ordering::SeqCst)
    }

    fn lock_image(&self) -> Result<MutexGuard<'_, DeviceImage>, GatewayError> {
        self.image
            .lock()
            .map_err(|_| GatewayError::Transport("Simulated device state is poisoned".to_string()))
    }

    fn take_fault(&self, wanted: SimulatedFault) -> bool {
        match self.fault.lock() {
            Ok(mut slot) if *slot == Some(wanted) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SessionConnector for SimulatedDevice {
    async fn connect(&self, device: &DeviceAddress) -> Result<Box<dyn ModbusSession>, GatewayError> {
        self.stats.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if self.take_fault(SimulatedFault::ConnectionRefused) {
            warn!("🧪 Simulated device refused connection from {}", device);
            return Err(GatewayError::Transport(format!(
                "Failed to connect to {}: connection refused",
                device
            )));
        }

        self.stats.open_sessions.fetch_add(1, Ordering::SeqCst);
        debug!("🧪 Simulated session opened for {}", device);
        Ok(Box::new(SimulatedSession {
            device: self.clone(),
            open: true,
        }))
    }
}

pub struct SimulatedSession {
    device: SimulatedDevice,
    open: bool,
}

impl SimulatedSession {
    fn begin(&mut self) -> Result<MutexGuard<'_, DeviceImage>, GatewayError> {
        if !self.open {
            return Err(GatewayError::Transport("Session is closed".to_string()));
        }
        self.device.stats.transactions.fetch_add(1, Ordering::SeqCst);

        if self.device.take_fault(SimulatedFault::DropConnection) {
            return Err(GatewayError::Transport(
                "Connection reset by peer".to_string(),
            ));
        }

        self.device.lock_image()
    }
}

#[async_trait]
impl ModbusSession for SimulatedSession {
    async fn read_discrete_inputs(&mut self, start: u16, count: u16) -> Result<Vec<bool>, GatewayError> {
        let image = self.begin()?;
        Ok(read_table(&image.discrete_inputs, start, count)?)
    }

    async fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, GatewayError> {
        let image = self.begin()?;
        Ok(read_table(&image.coils, start, count)?)
    }

    async fn read_input_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, GatewayError> {
        let image = self.begin()?;
        Ok(read_table(&image.input_registers, start, count)?)
    }

    async fn read_holding_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, GatewayError> {
        let image = self.begin()?;
        Ok(read_table(&image.holding_registers, start, count)?)
    }

    async fn write_coils(&mut self, start: u16, values: &[bool]) -> Result<(), GatewayError> {
        let mut image = self.begin()?;
        Ok(write_table(&mut image.coils, start, values)?)
    }

    async fn write_registers(&mut self, start: u16, values: &[u16]) -> Result<(), GatewayError> {
        let mut image = self.begin()?;
        Ok(write_table(&mut image.holding_registers, start, values)?)
    }

    async fn disconnect(&mut self) -> Result<(), GatewayError> {
        if self.open {
            self.open = false;
            self.device.stats.open_sessions.fetch_sub(1, Ordering::SeqCst);
            debug!("🧪 Simulated session closed");
        }
        Ok(())
    }
}

fn read_table<T: Copy>(table: &[T], start: u16, count: u16) -> Result<Vec<T>, ExceptionCode> {
    if count == 0 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let start = start as usize;
    let end = start + count as usize;
    table
        .get(start..end)
        .map(|slice| slice.to_vec())
        .ok_or(ExceptionCode::IllegalDataAddress)
}

fn write_table<T: Copy>(table: &mut [T], start: u16, values: &[T]) -> Result<(), ExceptionCode> {
    if values.is_empty() {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let start = start as usize;
    let end = start + values.len();
    let target = table
        .get_mut(start..end)
        .ok_or(ExceptionCode::IllegalDataAddress)?;
    target.copy_from_slice(values);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_address() -> DeviceAddress {
        DeviceAddress {
            ip: "127.0.0.1".to_string(),
            port: 502,
            slave_id: 1,
        }
    }

    #[tokio::test]
    async fn test_write_then_read_holding_registers() {
        let device = SimulatedDevice::new(32);
        let mut session = device.connect(&device_address()).await.unwrap();

        session.write_registers(4, &[7, 8, 9]).await.unwrap();
        let values = session.read_holding_registers(3, 5).await.unwrap();
        assert_eq!(values, vec![0, 7, 8, 9, 0]);

        session.disconnect().await.unwrap();
        assert_eq!(device.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_read_is_device_exception() {
        let device = SimulatedDevice::new(8);
        let mut session = device.connect(&device_address()).await.unwrap();

        let result = session.read_coils(6, 4).await;
        assert!(matches!(result, Err(GatewayError::Protocol { code: 0x02, .. })));
    }

    #[tokio::test]
    async fn test_injected_faults_are_one_shot() {
        let device = SimulatedDevice::new(8);

        device.inject_fault(SimulatedFault::ConnectionRefused);
        assert!(device.connect(&device_address()).await.is_err());
        assert_eq!(device.open_sessions(), 0);

        let mut session = device.connect(&device_address()).await.unwrap();
        device.inject_fault(SimulatedFault::DropConnection);
        assert!(matches!(
            session.read_input_registers(0, 1).await,
            Err(GatewayError::Transport(_))
        ));
        assert!(session.read_input_registers(0, 1).await.is_ok());
        assert_eq!(device.connect_attempts(), 2);
    }

    #[tokio::test]
    async fn test_seeded_tables_are_visible_to_sessions() {
        let device = SimulatedDevice::new(16);
        device.set_discrete_inputs(2, &[true, true]).unwrap();
        device.set_input_registers(0, &[42]).unwrap();

        let mut session = device.connect(&device_address()).await.unwrap();
        assert_eq!(
            session.read_discrete_inputs(1, 3).await.unwrap(),
            vec![false, true, true]
        );
        assert_eq!(session.read_input_registers(0, 1).await.unwrap(), vec![42]);
    }
}
