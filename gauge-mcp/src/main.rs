//! Gauge MCP Server
//!
//! Line-delimited JSON-RPC over stdio. Unit files found in the data directory
//! are loaded at startup; logs go to stderr.
//!
//! Tools:
//! - convert: Conversion factors between two units, optionally applied to a value
//! - lookup_unit: Definition of a unit
//! - list_units: Units of a dimension, optionally by system
//! - list_dimensions: Known dimensions
//! - are_compatible: Whether a list of units can be converted into each other
//! - output_format: Display format for a unit
//! - load_units: Load unit definitions supplied inline
//!
//! Resources:
//! - gauge://units - Unit files in the data directory
//! - gauge://units/{file} - Raw content of one file

mod config;
mod tools;

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use gauge_units::{DimensionRegistry, LoadReport, UnitRegistry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing_subscriber::EnvFilter;
use crate::config::Config;

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "gauge";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// MCP Protocol types
#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        McpError { code: -32602, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<gauge_units::UnitError> for McpError {
    fn from(e: gauge_units::UnitError) -> Self {
        McpError::invalid_params(e.to_string()).with_data(json!({ "code": e.code(), "error": e }))
    }
}

/// Shared server state
pub struct Server {
    pub config: Config,
    pub registry: Arc<UnitRegistry>,
}

impl Server {
    fn new(config: Config) -> Self {
        let registry = Arc::new(UnitRegistry::new(Arc::new(DimensionRegistry::new())));
        Server { config, registry }
    }

    /// Load every unit file of the data directory
    fn load_data_dir(&self) -> Vec<(String, LoadReport)> {
        let mut reports = Vec::new();
        for file in self.config.unit_files() {
            let text = match self.config.read_unit_file(&file.name) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(file = %file.name, "{}", e);
                    continue;
                }
            };
            let report = match file.format {
                Some(format) => format.load(&self.registry, &text, &file.name),
                None => {
                    let format = gauge_units::UnitsFileFormat::detect(&text)
                        .unwrap_or(gauge_units::UnitsFileFormat::Nws);
                    format.load(&self.registry, &text, &file.name)
                }
            };
            tracing::info!(
                file = %file.name,
                units = report.units_loaded,
                skipped = report.diagnostics.len(),
                "loaded unit file"
            );
            reports.push((file.name, report));
        }
        reports
    }
}

fn init_logging() {
    // stdout carries the protocol, so logs must go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn write_response(response: &McpResponse) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()
}

fn main() {
    init_logging();

    let server = Server::new(Config::from_env());

    tracing::info!(version = SERVER_VERSION, protocol = PROTOCOL_VERSION, "Gauge MCP Server started");
    tracing::info!(path = %server.config.data_path.display(), "data path");

    let reports = server.load_data_dir();
    tracing::info!(
        files = reports.len(),
        units = server.registry.len(),
        dimensions = server.registry.dimensions().len(),
        "unit registry ready"
    );

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    tracing::info!("Server ready, waiting for requests...");

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                tracing::info!("Client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                tracing::debug!(bytes = line.len(), "received request");

                let request: McpRequest = match serde_json::from_str(line) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Error parsing request: {}", e);
                        let response = McpResponse {
                            jsonrpc: "2.0".to_string(),
                            id: None,
                            result: None,
                            error: Some(McpError {
                                code: -32700,
                                message: format!("Parse error: {}", e),
                                data: None,
                            }),
                        };
                        if let Err(e) = write_response(&response) {
                            tracing::error!("Error writing response: {}", e);
                            break;
                        }
                        continue;
                    }
                };

                tracing::debug!(method = %request.method, "processing");

                let response = handle_request(&server, &request);

                // Notifications (no id) get no response
                if request.id.is_none() {
                    tracing::debug!(method = %request.method, "notification processed");
                    continue;
                }

                if let Err(e) = write_response(&response) {
                    tracing::error!("Error writing response: {}", e);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Error reading input: {}", e);
                break;
            }
        }
    }

    tracing::info!("Server shutting down");
}

fn handle_request(server: &Server, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "initialized" | "notifications/initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => Ok(tools::list()),
        "tools/call" => tools::call(server, &request.params),

        // Resources
        "resources/list" => handle_resources_list(server),
        "resources/read" => handle_resources_read(server, &request.params),

        _ => Err(McpError {
            code: -32601,
            message: format!("Method not found: {}", request.method),
            data: None,
        }),
    };

    match result {
        Ok(r) => McpResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: Some(r),
            error: None,
        },
        Err(e) => McpResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: None,
            error: Some(e),
        },
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params.as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    let client_protocol = params.as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    tracing::info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Hydrologic unit registry and conversion factors"
        },
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false }
        },
        "instructions": "Gauge converts values between units defined in NWS and RTi unit files. Use 'convert' for factors, 'list_units' to discover units of a dimension and 'output_format' for display precision."
    }))
}

fn handle_resources_list(server: &Server) -> Result<JsonValue, McpError> {
    let resources: Vec<JsonValue> = server.config.unit_files().iter().map(|f| {
        json!({
            "uri": format!("gauge://units/{}", f.name),
            "name": f.name,
            "description": match f.format {
                Some(format) => format!("{} unit definitions", format),
                None => "Unit definitions (format detected from content)".to_string(),
            },
            "mimeType": "text/plain",
            "size": f.size
        })
    }).collect();

    Ok(json!({ "resources": resources }))
}

fn handle_resources_read(server: &Server, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let uri = params.as_ref()
        .and_then(|p| p.get("uri"))
        .and_then(|u| u.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing uri parameter"))?;

    let name = uri.strip_prefix("gauge://units/")
        .ok_or_else(|| McpError::invalid_params(
            format!("Invalid URI: {}. Expected gauge://units/{{file}}", uri)))?;

    let content = server.config.read_unit_file(name).map_err(McpError::invalid_params)?;

    Ok(json!({
        "contents": [{
            "uri": uri,
            "mimeType": "text/plain",
            "text": content
        }]
    }))
}
