use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{validate_read, validate_write, Gateway};
use crate::modbus::TcpConnector;
use crate::output::formatters::formatter_for;

pub fn build_cli() -> Command {
    let device_args = [
        Arg::new("ip")
            .long("ip")
            .required(true)
            .help("Device IP address or host name"),
        Arg::new("device-port")
            .long("device-port")
            .value_parser(value_parser!(i64))
            .default_value("502")
            .help("Device Modbus/TCP port"),
        Arg::new("slave-id")
            .long("slave-id")
            .value_parser(value_parser!(i64))
            .default_value("1")
            .help("Modbus unit identifier"),
        Arg::new("type-prefix")
            .long("type-prefix")
            .value_parser(value_parser!(i64))
            .required(true)
            .help("0 discrete input, 1 coil, 3 input register, 4 holding register"),
        Arg::new("start-address")
            .long("start-address")
            .value_parser(value_parser!(i64))
            .required(true)
            .help("First point address"),
    ];

    Command::new("modbus-explorer")
        .version(crate::VERSION)
        .about("HTTP to Modbus/TCP gateway")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .global(true)
                .help("Address the HTTP API binds to"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .global(true)
                .value_parser(value_parser!(u16))
                .help("Port the HTTP API listens on"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter (error, warn, info, debug, trace); RUST_LOG takes precedence"),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP API (default)")
                .arg(
                    Arg::new("simulate")
                        .long("simulate")
                        .action(ArgAction::SetTrue)
                        .help("Answer every request from an in-memory simulated device"),
                ),
        )
        .subcommand(
            Command::new("read")
                .about("Perform a single read and print the result")
                .args(device_args.clone())
                .arg(
                    Arg::new("count")
                        .long("count")
                        .value_parser(value_parser!(i64))
                        .help("Number of points to read (default 1)"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_parser(["console", "json", "csv", "hex"])
                        .default_value("console")
                        .help("Output format"),
                ),
        )
        .subcommand(
            Command::new("write")
                .about("Perform a single write")
                .args(device_args)
                .arg(
                    Arg::new("data")
                        .long("data")
                        .required(true)
                        .help("Comma separated values, e.g. 1,0,1"),
                )
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_parser(["console", "json", "csv", "hex"])
                        .default_value("console")
                        .help("Output format"),
                ),
        )
        .subcommand(
            Command::new("init-config")
                .about("Write the default configuration file")
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .default_value("modbus-explorer.toml")
                        .help("Destination path"),
                ),
        )
}

/// Runs one-shot subcommands. Returns `false` when the caller should serve.
pub async fn handle_subcommands(
    matches: &ArgMatches,
    config: &Config,
) -> Result<bool, Box<dyn std::error::Error>> {
    let gateway = Gateway::new(Arc::new(TcpConnector::new()));

    if let Some(matches) = matches.subcommand_matches("read") {
        info!("🔍 Executing read command...");

        let mut body = device_body(matches);
        if let Some(count) = matches.get_one::<i64>("count") {
            body.insert("count".to_string(), json!(count));
        }
        let request = validate_read(&Value::Object(body))?;
        let result = gateway.handle_read(&request).await?;

        let formatter = selected_formatter(matches)?;
        print!("{}", formatter.format_header());
        println!("{}", formatter.format_read(&request, &result));
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("write") {
        info!("✏️  Executing write command...");

        let mut body = device_body(matches);
        body.insert("data".to_string(), parse_data_list(matches.get_one::<String>("data")));
        let request = validate_write(&Value::Object(body))?;
        let result = gateway.handle_write(&request).await?;

        let formatter = selected_formatter(matches)?;
        print!("{}", formatter.format_header());
        println!("{}", formatter.format_write(&request, &result));
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("init-config") {
        let default_path = "modbus-explorer.toml".to_string();
        let path = matches.get_one::<String>("output").unwrap_or(&default_path);

        config.save_to_file(path)?;
        println!("✅ Configuration written to {}", path);
        return Ok(true);
    }

    Ok(false)
}

/// Same field names as the HTTP body so both paths share one validator.
fn device_body(matches: &ArgMatches) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(ip) = matches.get_one::<String>("ip") {
        body.insert("ip".to_string(), json!(ip));
    }
    for (arg, field) in [
        ("device-port", "port"),
        ("slave-id", "slave_id"),
        ("type-prefix", "type_prefix"),
        ("start-address", "start_address"),
    ] {
        if let Some(value) = matches.get_one::<i64>(arg) {
            body.insert(field.to_string(), json!(value));
        }
    }
    body
}

fn parse_data_list(raw: Option<&String>) -> Value {
    match raw {
        Some(list) => Value::Array(
            list.split(',')
                .filter(|item| !item.trim().is_empty())
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        None => Value::Null,
    }
}

fn selected_formatter(
    matches: &ArgMatches,
) -> Result<Box<dyn crate::output::DataFormatter>, Box<dyn std::error::Error>> {
    let name = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("console");
    formatter_for(name).ok_or_else(|| format!("Unknown output format: {}", name).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_read_args_map_to_request() {
        let matches = build_cli()
            .try_get_matches_from([
                "modbus-explorer",
                "read",
                "--ip",
                "10.1.1.1",
                "--type-prefix",
                "3",
                "--start-address",
                "7",
                "--count",
                "4",
            ])
            .unwrap();
        let read = matches.subcommand_matches("read").unwrap();

        let mut body = device_body(read);
        body.insert("count".to_string(), json!(4));
        let request = validate_read(&Value::Object(body)).unwrap();
        assert_eq!(request.device.port, 502);
        assert_eq!(request.device.slave_id, 1);
        assert_eq!(request.start_address, 7);
        assert_eq!(request.count, 4);
    }

    #[test]
    fn test_write_data_list() {
        let data = parse_data_list(Some(&"1, 0,1,".to_string()));
        assert_eq!(data, json!(["1", "0", "1"]));

        let matches = build_cli()
            .try_get_matches_from([
                "modbus-explorer",
                "write",
                "--ip",
                "10.1.1.1",
                "--type-prefix",
                "1",
                "--start-address",
                "10",
                "--data",
                "1,0,1",
            ])
            .unwrap();
        let write = matches.subcommand_matches("write").unwrap();
        let mut body = device_body(write);
        body.insert("data".to_string(), parse_data_list(write.get_one::<String>("data")));
        assert_eq!(validate_write(&Value::Object(body)).unwrap().values, vec![1, 0, 1]);
    }

    #[test]
    fn test_global_overrides_apply_to_config() {
        let matches = build_cli()
            .try_get_matches_from(["modbus-explorer", "serve", "--port", "8502", "--log-level", "debug"])
            .unwrap();

        let config = Config::load(&matches).unwrap();
        assert_eq!(config.api.port, 8502);
        assert_eq!(config.logging.level, "debug");
        assert!(matches
            .subcommand_matches("serve")
            .map(|m| !m.get_flag("simulate"))
            .unwrap_or(false));
    }
}
