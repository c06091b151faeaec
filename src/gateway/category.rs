use std::fmt;

use crate::modbus::protocol::{MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS};
use crate::utils::error::GatewayError;

// Discriminants are the API type_prefix values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegisterCategory {
    DiscreteInput = 0,
    Coil = 1,
    InputRegister = 3,
    HoldingRegister = 4,
}

pub const READ_CATEGORIES: [RegisterCategory; 4] = [
    RegisterCategory::DiscreteInput,
    RegisterCategory::Coil,
    RegisterCategory::InputRegister,
    RegisterCategory::HoldingRegister,
];

pub const WRITE_CATEGORIES: [RegisterCategory; 2] = [
    RegisterCategory::Coil,
    RegisterCategory::HoldingRegister,
];

impl RegisterCategory {
    pub fn from_prefix(prefix: i64) -> Option<Self> {
        match prefix {
            0 => Some(RegisterCategory::DiscreteInput),
            1 => Some(RegisterCategory::Coil),
            3 => Some(RegisterCategory::InputRegister),
            4 => Some(RegisterCategory::HoldingRegister),
            _ => None,
        }
    }

    pub fn prefix(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            RegisterCategory::DiscreteInput => "discrete input",
            RegisterCategory::Coil => "coil",
            RegisterCategory::InputRegister => "input register",
            RegisterCategory::HoldingRegister => "holding register",
        }
    }

    fn read_operation(self) -> ReadOperation {
        match self {
            RegisterCategory::DiscreteInput => ReadOperation::DiscreteInputs,
            RegisterCategory::Coil => ReadOperation::Coils,
            RegisterCategory::InputRegister => ReadOperation::InputRegisters,
            RegisterCategory::HoldingRegister => ReadOperation::HoldingRegisters,
        }
    }

    fn write_operation(self) -> Option<WriteOperation> {
        match self {
            RegisterCategory::Coil => Some(WriteOperation::Coils),
            RegisterCategory::HoldingRegister => Some(WriteOperation::Registers),
            RegisterCategory::DiscreteInput | RegisterCategory::InputRegister => None,
        }
    }
}

impl fmt::Display for RegisterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOperation {
    DiscreteInputs,
    Coils,
    InputRegisters,
    HoldingRegisters,
}

impl ReadOperation {
    pub fn category(self) -> RegisterCategory {
        match self {
            ReadOperation::DiscreteInputs => RegisterCategory::DiscreteInput,
            ReadOperation::Coils => RegisterCategory::Coil,
            ReadOperation::InputRegisters => RegisterCategory::InputRegister,
            ReadOperation::HoldingRegisters => RegisterCategory::HoldingRegister,
        }
    }

    pub fn function_code(self) -> u8 {
        match self {
            ReadOperation::Coils => 0x01,
            ReadOperation::DiscreteInputs => 0x02,
            ReadOperation::HoldingRegisters => 0x03,
            ReadOperation::InputRegisters => 0x04,
        }
    }

    pub fn max_quantity(self) -> u16 {
        match self {
            ReadOperation::DiscreteInputs | ReadOperation::Coils => MAX_READ_BITS,
            ReadOperation::InputRegisters | ReadOperation::HoldingRegisters => MAX_READ_REGISTERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Coils,
    Registers,
}

impl WriteOperation {
    pub fn category(self) -> RegisterCategory {
        match self {
            WriteOperation::Coils => RegisterCategory::Coil,
            WriteOperation::Registers => RegisterCategory::HoldingRegister,
        }
    }

    pub fn function_code(self) -> u8 {
        match self {
            WriteOperation::Coils => 0x0F,
            WriteOperation::Registers => 0x10,
        }
    }

    pub fn max_quantity(self) -> u16 {
        match self {
            WriteOperation::Coils => MAX_WRITE_COILS,
            WriteOperation::Registers => MAX_WRITE_REGISTERS,
        }
    }

    pub fn max_value(self) -> i64 {
        match self {
            WriteOperation::Coils => 1,
            WriteOperation::Registers => u16::MAX as i64,
        }
    }
}

pub fn resolve_for_read(category_id: i64) -> Result<ReadOperation, GatewayError> {
    RegisterCategory::from_prefix(category_id)
        .filter(|category| READ_CATEGORIES.contains(category))
        .map(RegisterCategory::read_operation)
        .ok_or(GatewayError::InvalidCategory(category_id))
}

pub fn resolve_for_write(category_id: i64) -> Result<WriteOperation, GatewayError> {
    RegisterCategory::from_prefix(category_id)
        .filter(|category| WRITE_CATEGORIES.contains(category))
        .and_then(RegisterCategory::write_operation)
        .ok_or(GatewayError::InvalidCategory(category_id))
}

pub fn describe_prefixes(categories: &[RegisterCategory]) -> String {
    categories
        .iter()
        .map(|c| c.prefix().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_resolution() {
        assert_eq!(resolve_for_read(0).unwrap(), ReadOperation::DiscreteInputs);
        assert_eq!(resolve_for_read(1).unwrap(), ReadOperation::Coils);
        assert_eq!(resolve_for_read(3).unwrap(), ReadOperation::InputRegisters);
        assert_eq!(resolve_for_read(4).unwrap(), ReadOperation::HoldingRegisters);

        for invalid in [-1, 2, 5, 40001] {
            assert!(matches!(
                resolve_for_read(invalid),
                Err(GatewayError::InvalidCategory(id)) if id == invalid
            ));
        }
    }

    #[test]
    fn test_write_resolution_rejects_read_only_tables() {
        assert_eq!(resolve_for_write(1).unwrap(), WriteOperation::Coils);
        assert_eq!(resolve_for_write(4).unwrap(), WriteOperation::Registers);

        for invalid in [0, 2, 3, 5] {
            assert!(resolve_for_write(invalid).is_err(), "prefix {} must not be writable", invalid);
        }
    }

    #[test]
    fn test_write_set_matches_write_operations() {
        for category in READ_CATEGORIES {
            assert_eq!(
                WRITE_CATEGORIES.contains(&category),
                category.write_operation().is_some(),
                "{}",
                category
            );
        }
    }

    #[test]
    fn test_prefix_roundtrip_and_listing() {
        for category in READ_CATEGORIES {
            assert_eq!(RegisterCategory::from_prefix(category.prefix() as i64), Some(category));
        }
        assert_eq!(describe_prefixes(&WRITE_CATEGORIES), "1, 4");
    }
}
