use serde::{Serialize, Serializer};

use crate::modbus::protocol::RawReadData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterValue {
    Bit(bool),
    Word(u16),
}

impl RegisterValue {
    pub fn as_u16(self) -> u16 {
        match self {
            RegisterValue::Bit(bit) => bit as u16,
            RegisterValue::Word(word) => word,
        }
    }
}

// Serialized as a plain integer so that bits read back as 0/1.
impl Serialize for RegisterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterReading {
    pub address: u16,
    pub value: RegisterValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    pub registers: Vec<RegisterReading>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub result: bool,
}

/// Attaches `start_address + index` to every value, in ascending order.
pub fn shape_read(raw: RawReadData, start_address: u16) -> ReadResult {
    let values: Vec<RegisterValue> = match raw {
        RawReadData::Bits(bits) => bits.into_iter().map(RegisterValue::Bit).collect(),
        RawReadData::Words(words) => words.into_iter().map(RegisterValue::Word).collect(),
    };

    let registers = (start_address..=u16::MAX)
        .zip(values)
        .map(|(address, value)| RegisterReading { address, value })
        .collect();

    ReadResult { registers }
}

pub fn shape_write() -> WriteResult {
    WriteResult { result: true }
}
