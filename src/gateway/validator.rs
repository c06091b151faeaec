use serde_json::{Map, Value};

use super::category::{self, describe_prefixes, ReadOperation, WriteOperation, READ_CATEGORIES, WRITE_CATEGORIES};
use super::request::{ReadRequest, WriteRequest};
use crate::modbus::client::DeviceAddress;
use crate::modbus::protocol::ADDRESS_SPACE;
use crate::utils::error::ValidationError;

// Fields are checked in order (ip, port, slave_id, type_prefix,
// start_address, count/data); the first failure wins. null counts as absent.
pub fn validate_read(body: &Value) -> Result<ReadRequest, ValidationError> {
    let fields = as_object(body)?;
    let device = device_address(fields)?;

    let prefix = required_integer(fields, "type_prefix")?;
    let operation = category::resolve_for_read(prefix).map_err(|_| {
        ValidationError::new(
            "type_prefix",
            format!("{} is not readable, expected one of {}", prefix, describe_prefixes(&READ_CATEGORIES)),
        )
    })?;

    let start_address = start_address(fields)?;
    let count = read_count(fields, operation)?;
    check_span(start_address, count, "count")?;

    Ok(ReadRequest {
        device,
        category: operation.category(),
        start_address,
        count,
    })
}

pub fn validate_write(body: &Value) -> Result<WriteRequest, ValidationError> {
    let fields = as_object(body)?;
    let device = device_address(fields)?;

    let prefix = required_integer(fields, "type_prefix")?;
    let operation = category::resolve_for_write(prefix).map_err(|_| {
        ValidationError::new(
            "type_prefix",
            format!("{} is not writable, expected one of {}", prefix, describe_prefixes(&WRITE_CATEGORIES)),
        )
    })?;

    let start_address = start_address(fields)?;
    let values = write_values(fields, operation)?;
    check_span(start_address, values.len() as u16, "data")?;

    Ok(WriteRequest {
        device,
        category: operation.category(),
        start_address,
        values,
    })
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationError> {
    body.as_object()
        .ok_or_else(|| ValidationError::new("body", "request body must be a JSON object"))
}

fn device_address(fields: &Map<String, Value>) -> Result<DeviceAddress, ValidationError> {
    let ip = match fields.get("ip") {
        None | Some(Value::Null) => return Err(ValidationError::missing("ip")),
        Some(Value::String(ip)) if !ip.trim().is_empty() => ip.trim().to_string(),
        Some(Value::String(_)) => return Err(ValidationError::new("ip", "must not be empty")),
        Some(other) => {
            return Err(ValidationError::new(
                "ip",
                format!("expected a string, got {}", type_name(other)),
            ))
        }
    };

    let port = bounded(required_integer(fields, "port")?, "port", 1, u16::MAX as i64)? as u16;
    let slave_id = bounded(required_integer(fields, "slave_id")?, "slave_id", 0, u8::MAX as i64)? as u8;

    Ok(DeviceAddress { ip, port, slave_id })
}

fn start_address(fields: &Map<String, Value>) -> Result<u16, ValidationError> {
    let start = required_integer(fields, "start_address")?;
    Ok(bounded(start, "start_address", 0, u16::MAX as i64)? as u16)
}

fn read_count(fields: &Map<String, Value>, operation: ReadOperation) -> Result<u16, ValidationError> {
    let count = optional_integer(fields, "count")?.unwrap_or(1);
    Ok(bounded(count, "count", 1, operation.max_quantity() as i64)? as u16)
}

fn write_values(fields: &Map<String, Value>, operation: WriteOperation) -> Result<Vec<u16>, ValidationError> {
    let items = match fields.get("data") {
        None | Some(Value::Null) => return Err(ValidationError::missing("data")),
        Some(Value::Array(items)) => items.as_slice(),
        // A lone integer is taken as a one-element list.
        Some(single) if coerce_integer(single).is_some() => std::slice::from_ref(single),
        Some(other) => {
            return Err(ValidationError::new(
                "data",
                format!("expected an array of integers, got {}", type_name(other)),
            ))
        }
    };

    if items.is_empty() {
        return Err(ValidationError::new("data", "must contain at least one value"));
    }
    if items.len() > operation.max_quantity() as usize {
        return Err(ValidationError::new(
            "data",
            format!(
                "at most {} values can be written in one request, got {}",
                operation.max_quantity(),
                items.len()
            ),
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let value = coerce_integer(item).ok_or_else(|| {
                ValidationError::new(
                    "data",
                    format!("element {} is not an integer ({})", index, type_name(item)),
                )
            })?;
            if value < 0 || value > operation.max_value() {
                return Err(ValidationError::new(
                    "data",
                    format!(
                        "element {} is {}, must be between 0 and {}",
                        index,
                        value,
                        operation.max_value()
                    ),
                ));
            }
            Ok(value as u16)
        })
        .collect()
}

/// The addressed range must stay inside the 16-bit address space.
fn check_span(start: u16, quantity: u16, field: &str) -> Result<(), ValidationError> {
    if start as u32 + quantity as u32 > ADDRESS_SPACE {
        return Err(ValidationError::new(
            field,
            format!(
                "range starting at {} with {} points exceeds the Modbus address space",
                start, quantity
            ),
        ));
    }
    Ok(())
}

fn required_integer(fields: &Map<String, Value>, name: &str) -> Result<i64, ValidationError> {
    optional_integer(fields, name)?.ok_or_else(|| ValidationError::missing(name))
}

fn optional_integer(fields: &Map<String, Value>, name: &str) -> Result<Option<i64>, ValidationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_integer(value).map(Some).ok_or_else(|| {
            ValidationError::new(name, format!("expected an integer, got {}", type_name(value)))
        }),
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            // Whole floats such as `1.0` count as integers.
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn bounded(value: i64, name: &str, min: i64, max: i64) -> Result<i64, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::new(
            name,
            format!("{} is out of range, must be between {} and {}", value, min, max),
        ));
    }
    Ok(value)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(number) if number.is_u64() => "an integer too large for this field",
        Value::Number(_) => "a non-integer number",
        Value::String(_) => "a non-numeric string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::category::RegisterCategory;
    use serde_json::json;

    fn read_body() -> Value {
        json!({
            "ip": "192.168.1.20",
            "port": 502,
            "slave_id": 1,
            "type_prefix": 4,
            "start_address": 100,
            "count": 3
        })
    }

    fn write_body() -> Value {
        json!({
            "ip": "192.168.1.20",
            "port": 502,
            "slave_id": 1,
            "type_prefix": 1,
            "start_address": 10,
            "data": [1, 0, 1]
        })
    }

    fn without(mut body: Value, field: &str) -> Value {
        body.as_object_mut().unwrap().remove(field);
        body
    }

    fn with(mut body: Value, field: &str, value: Value) -> Value {
        body[field] = value;
        body
    }

    #[test]
    fn test_valid_read_request() {
        let request = validate_read(&read_body()).unwrap();
        assert_eq!(request.device.ip, "192.168.1.20");
        assert_eq!(request.device.port, 502);
        assert_eq!(request.device.slave_id, 1);
        assert_eq!(request.category, RegisterCategory::HoldingRegister);
        assert_eq!(request.start_address, 100);
        assert_eq!(request.count, 3);
    }

    #[test]
    fn test_count_defaults_to_one() {
        let implicit = validate_read(&without(read_body(), "count")).unwrap();
        let explicit = validate_read(&with(read_body(), "count", json!(1))).unwrap();
        assert_eq!(implicit, explicit);
        assert_eq!(implicit.count, 1);

        let null_count = validate_read(&with(read_body(), "count", Value::Null)).unwrap();
        assert_eq!(null_count.count, 1);
    }

    #[test]
    fn test_missing_fields_are_named() {
        for field in ["ip", "port", "slave_id", "type_prefix", "start_address"] {
            let err = validate_read(&without(read_body(), field)).unwrap_err();
            assert_eq!(err.field, field);

            let err = validate_write(&without(write_body(), field)).unwrap_err();
            assert_eq!(err.field, field);
        }

        let err = validate_write(&without(write_body(), "data")).unwrap_err();
        assert_eq!(err.field, "data");
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let body = with(read_body(), "port", json!("1502"));
        assert_eq!(validate_read(&body).unwrap().device.port, 1502);

        let body = with(read_body(), "port", json!("modbus"));
        let err = validate_read(&body).unwrap_err();
        assert_eq!(err.field, "port");
        assert!(err.reason.contains("integer"));

        let body = with(read_body(), "start_address", json!(1.5));
        assert_eq!(validate_read(&body).unwrap_err().field, "start_address");
    }

    #[test]
    fn test_whole_floats_are_integers() {
        let body = with(read_body(), "count", json!(3.0));
        assert_eq!(validate_read(&body).unwrap().count, 3);

        let body = with(write_body(), "data", json!([1.0, 0.0]));
        assert_eq!(validate_write(&body).unwrap().values, vec![1, 0]);
    }

    #[test]
    fn test_oversized_integer_reason() {
        let body = with(read_body(), "start_address", json!(u64::MAX));
        let err = validate_read(&body).unwrap_err();
        assert_eq!(err.field, "start_address");
        assert!(err.reason.contains("too large"));
        assert!(!err.reason.contains("non-integer"));
    }

    #[test]
    fn test_illegal_type_prefix_per_endpoint() {
        for prefix in [2, 5, -1] {
            let err = validate_read(&with(read_body(), "type_prefix", json!(prefix))).unwrap_err();
            assert_eq!(err.field, "type_prefix");
        }
        for prefix in [0, 3, 7] {
            let err = validate_write(&with(write_body(), "type_prefix", json!(prefix))).unwrap_err();
            assert_eq!(err.field, "type_prefix");
        }
    }

    #[test]
    fn test_bounds() {
        assert_eq!(validate_read(&with(read_body(), "count", json!(0))).unwrap_err().field, "count");
        assert_eq!(validate_read(&with(read_body(), "count", json!(126))).unwrap_err().field, "count");

        let coils = with(read_body(), "type_prefix", json!(1));
        assert_eq!(validate_read(&with(coils, "count", json!(2000))).unwrap().count, 2000);

        assert_eq!(validate_read(&with(read_body(), "port", json!(0))).unwrap_err().field, "port");
        assert_eq!(validate_read(&with(read_body(), "slave_id", json!(256))).unwrap_err().field, "slave_id");
        assert_eq!(
            validate_read(&with(read_body(), "start_address", json!(-1))).unwrap_err().field,
            "start_address"
        );

        let near_end = with(read_body(), "start_address", json!(65534));
        assert_eq!(validate_read(&near_end).unwrap_err().field, "count");
        let last_two = with(near_end, "count", json!(2));
        assert_eq!(validate_read(&last_two).unwrap().start_address, 65534);
    }

    #[test]
    fn test_ip_must_be_a_non_empty_string() {
        assert_eq!(validate_read(&with(read_body(), "ip", json!(""))).unwrap_err().field, "ip");
        assert_eq!(validate_read(&with(read_body(), "ip", json!(42))).unwrap_err().field, "ip");
        assert_eq!(
            validate_read(&with(read_body(), "ip", json!("plc.local"))).unwrap().device.ip,
            "plc.local"
        );
    }

    #[test]
    fn test_write_values() {
        let request = validate_write(&write_body()).unwrap();
        assert_eq!(request.category, RegisterCategory::Coil);
        assert_eq!(request.values, vec![1, 0, 1]);

        let err = validate_write(&with(write_body(), "data", json!([1, 2]))).unwrap_err();
        assert_eq!(err.field, "data");

        let registers = with(write_body(), "type_prefix", json!(4));
        let request = validate_write(&with(registers.clone(), "data", json!([0, 65535]))).unwrap();
        assert_eq!(request.values, vec![0, 65535]);
        assert!(validate_write(&with(registers.clone(), "data", json!([65536]))).is_err());
        assert!(validate_write(&with(registers.clone(), "data", json!([]))).is_err());
        assert!(validate_write(&with(registers.clone(), "data", json!(["x"]))).is_err());

        let single = validate_write(&with(registers, "data", json!(7))).unwrap();
        assert_eq!(single.values, vec![7]);
    }

    #[test]
    fn test_body_must_be_an_object() {
        assert_eq!(validate_read(&json!([1, 2, 3])).unwrap_err().field, "body");
        assert_eq!(validate_write(&Value::Null).unwrap_err().field, "body");
    }
}
