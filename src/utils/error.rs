use thiserror::Error;
use tokio_modbus::ExceptionCode;

/// A request field that is missing, malformed or out of range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, "required field is missing")
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid register category: {0}")]
    InvalidCategory(i64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Device exception 0x{code:02X} ({exception})")]
    Protocol { code: u8, exception: String },
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) | GatewayError::InvalidCategory(_) => "VALIDATION_ERROR",
            GatewayError::Transport(_) => "TRANSPORT_ERROR",
            GatewayError::Protocol { .. } => "PROTOCOL_ERROR",
        }
    }

    /// Field blamed for a client-side failure, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            GatewayError::Validation(e) => Some(&e.field),
            GatewayError::InvalidCategory(_) => Some("type_prefix"),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, GatewayError::Validation(_) | GatewayError::InvalidCategory(_))
    }
}

impl From<ExceptionCode> for GatewayError {
    fn from(code: ExceptionCode) -> Self {
        let exception = format!("{:?}", code);
        GatewayError::Protocol {
            code: u8::from(code),
            exception,
        }
    }
}

impl From<tokio_modbus::Error> for GatewayError {
    fn from(err: tokio_modbus::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Transport(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_maps_to_protocol_error() {
        let err = GatewayError::from(ExceptionCode::IllegalDataAddress);
        match &err {
            GatewayError::Protocol { code, .. } => assert_eq!(*code, 0x02),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.kind(), "PROTOCOL_ERROR");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_validation_error_names_field() {
        let err: GatewayError = ValidationError::missing("ip").into();
        assert_eq!(err.field(), Some("ip"));
        assert!(err.is_client_error());
        assert!(err.to_string().contains("ip"));
    }
}
