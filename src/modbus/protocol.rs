/// Number of addressable points per Modbus data table.
pub const ADDRESS_SPACE: u32 = 0x1_0000;

// Quantity limits from the Modbus application protocol (PDU size bound).
pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_COILS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Raw payload of a read transaction, before addresses are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReadData {
    Bits(Vec<bool>),
    Words(Vec<u16>),
}

impl RawReadData {
    pub fn len(&self) -> usize {
        match self {
            RawReadData::Bits(bits) => bits.len(),
            RawReadData::Words(words) => words.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
