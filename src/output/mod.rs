pub mod formatters;

pub use formatters::{formatter_for, ConsoleFormatter, CsvFormatter, DataFormatter, HexFormatter, JsonFormatter};
