use chrono::Utc;

use crate::gateway::{ReadRequest, ReadResult, RegisterValue, WriteRequest, WriteResult};

pub trait DataFormatter: Send + Sync {
    fn format_read(&self, request: &ReadRequest, result: &ReadResult) -> String;
    fn format_write(&self, request: &WriteRequest, result: &WriteResult) -> String;
    fn format_header(&self) -> String;
}

/// Picks a formatter by its CLI name.
pub fn formatter_for(name: &str) -> Option<Box<dyn DataFormatter>> {
    match name {
        "console" => Some(Box::new(ConsoleFormatter)),
        "json" => Some(Box::new(JsonFormatter)),
        "csv" => Some(Box::new(CsvFormatter)),
        "hex" => Some(Box::new(HexFormatter)),
        _ => None,
    }
}

pub struct ConsoleFormatter;

impl DataFormatter for ConsoleFormatter {
    fn format_read(&self, request: &ReadRequest, result: &ReadResult) -> String {
        let mut output = format!(
            "📊 {} {}(s) from {}:\n",
            result.registers.len(),
            request.category.name(),
            request.device
        );
        output.push_str(&"═".repeat(40));
        output.push('\n');

        for reading in &result.registers {
            let value = match reading.value {
                RegisterValue::Bit(true) => "1 (ON)".to_string(),
                RegisterValue::Bit(false) => "0 (OFF)".to_string(),
                RegisterValue::Word(word) => word.to_string(),
            };
            output.push_str(&format!("  {:>5}: {}\n", reading.address, value));
        }
        output
    }

    fn format_write(&self, request: &WriteRequest, result: &WriteResult) -> String {
        format!(
            "✅ Wrote {} {}(s) to {} starting at {} (result: {})\n",
            request.values.len(),
            request.category.name(),
            request.device,
            request.start_address,
            result.result
        )
    }

    fn format_header(&self) -> String {
        format!("🚀 Modbus Explorer - {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

pub struct JsonFormatter;

impl DataFormatter for JsonFormatter {
    fn format_read(&self, request: &ReadRequest, result: &ReadResult) -> String {
        let json_data = serde_json::json!({
            "device": request.device.to_string(),
            "type_prefix": request.category.prefix(),
            "timestamp": Utc::now().to_rfc3339(),
            "registers": result.registers,
        });

        serde_json::to_string_pretty(&json_data).unwrap_or_default()
    }

    fn format_write(&self, _request: &WriteRequest, result: &WriteResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_default()
    }

    fn format_header(&self) -> String {
        String::new() // JSON doesn't need headers
    }
}

pub struct CsvFormatter;

impl DataFormatter for CsvFormatter {
    fn format_read(&self, _request: &ReadRequest, result: &ReadResult) -> String {
        let timestamp = Utc::now().to_rfc3339();
        result
            .registers
            .iter()
            .map(|r| format!("{},{},{}\n", r.address, r.value.as_u16(), timestamp))
            .collect()
    }

    fn format_write(&self, request: &WriteRequest, _result: &WriteResult) -> String {
        // Same columns as the header; a failed write never reaches the formatter.
        let timestamp = Utc::now().to_rfc3339();
        request
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{},{},{}\n", request.start_address as usize + i, v, timestamp))
            .collect()
    }

    fn format_header(&self) -> String {
        "Address,Value,Timestamp\n".to_string()
    }
}

pub struct HexFormatter;

impl DataFormatter for HexFormatter {
    fn format_read(&self, request: &ReadRequest, result: &ReadResult) -> String {
        let mut output = format!("🔍 {} Hex Data ({}):\n", request.device, request.category);
        for reading in &result.registers {
            let word = reading.value.as_u16();
            output.push_str(&format!("  0x{:04X}: 0x{:04X} ({})\n", reading.address, word, word));
        }
        output
    }

    fn format_write(&self, request: &WriteRequest, _result: &WriteResult) -> String {
        let words: Vec<String> = request.values.iter().map(|v| format!("0x{:04X}", v)).collect();
        format!(
            "🔍 Wrote [{}] at 0x{:04X} on {}\n",
            words.join(", "),
            request.start_address,
            request.device
        )
    }

    fn format_header(&self) -> String {
        format!("🔍 Hex Data Output - {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::shaper::{shape_read, shape_write};
    use crate::gateway::RegisterCategory;
    use crate::modbus::{DeviceAddress, RawReadData};

    fn request() -> ReadRequest {
        ReadRequest {
            device: DeviceAddress {
                ip: "10.0.0.9".to_string(),
                port: 502,
                slave_id: 2,
            },
            category: RegisterCategory::InputRegister,
            start_address: 16,
            count: 2,
        }
    }

    #[test]
    fn test_csv_rows() {
        let result = shape_read(RawReadData::Words(vec![255, 256]), 16);
        let csv = CsvFormatter.format_read(&request(), &result);
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("16,255,"));
        assert!(rows[1].starts_with("17,256,"));
    }

    #[test]
    fn test_csv_write_rows_match_header() {
        let request = WriteRequest {
            device: request().device,
            category: RegisterCategory::HoldingRegister,
            start_address: 3,
            values: vec![7, 8],
        };
        let output = CsvFormatter.format_header() + &CsvFormatter.format_write(&request, &shape_write());

        let columns: Vec<usize> = output.lines().map(|line| line.split(',').count()).collect();
        assert_eq!(columns, vec![3, 3, 3]);
        assert!(output.lines().nth(1).unwrap().starts_with("3,7,"));
        assert!(output.lines().nth(2).unwrap().starts_with("4,8,"));
    }

    #[test]
    fn test_hex_and_json_output() {
        let result = shape_read(RawReadData::Words(vec![0xBEEF]), 16);
        assert!(HexFormatter.format_read(&request(), &result).contains("0x0010: 0xBEEF"));

        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_read(&request(), &result)).unwrap();
        assert_eq!(json["type_prefix"], 3);
        assert_eq!(json["registers"][0]["value"], 0xBEEF);
    }

    #[test]
    fn test_formatter_lookup() {
        for name in ["console", "json", "csv", "hex"] {
            assert!(formatter_for(name).is_some());
        }
        assert!(formatter_for("xml").is_none());
    }
}
