//! Tool definitions and handlers

use gauge_units::{UnitFormat, UnitSystem, UnitsFileFormat, DEFAULT_PRECISION};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use crate::{McpError, Server};

pub fn list() -> JsonValue {
    json!({
        "tools": [
            {
                "name": "convert",
                "description": "Conversion factors from one unit to another (new = old * mult_factor + add_factor). Applies them to 'value' when given.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "from": { "type": "string", "description": "Source unit abbreviation (e.g., \"CFS\")" },
                        "to": { "type": "string", "description": "Target unit abbreviation (e.g., \"CMS\")" },
                        "value": { "type": "number", "description": "Value to convert" }
                    },
                    "required": ["from", "to"]
                }
            },
            {
                "name": "lookup_unit",
                "description": "Definition of a unit: dimension, factors, system, output precision.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "abbreviation": { "type": "string", "description": "Unit abbreviation (case-insensitive)" }
                    },
                    "required": ["abbreviation"]
                }
            },
            {
                "name": "list_units",
                "description": "Units belonging to a dimension, optionally restricted to a measurement system.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "dimension": { "type": "string", "description": "Dimension abbreviation (e.g., \"L3/T\")" },
                        "system": {
                            "type": "string",
                            "description": "Measurement system filter",
                            "enum": ["ENGL", "SI", "ALL"]
                        }
                    },
                    "required": ["dimension"]
                }
            },
            {
                "name": "list_dimensions",
                "description": "All known dimensions.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "are_compatible",
                "description": "Whether every unit in the list converts to the first one.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "units": { "type": "array", "items": { "type": "string" } },
                        "require_same": {
                            "type": "boolean",
                            "description": "Also require identity conversion (default: false)",
                            "default": false
                        }
                    },
                    "required": ["units"]
                }
            },
            {
                "name": "output_format",
                "description": "Fixed-point display format for values in a unit. Formats 'value' when given.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "unit": { "type": "string" },
                        "width": { "type": "integer", "description": "Field width (default from server config)" },
                        "default_precision": {
                            "type": "integer",
                            "description": "Precision used when the unit is unknown (default: 2)",
                            "default": 2
                        },
                        "value": { "type": "number" }
                    },
                    "required": ["unit"]
                }
            },
            {
                "name": "load_units",
                "description": "Load unit definitions from text in NWS or RTi format.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "content": { "type": "string", "description": "File content" },
                        "format": {
                            "type": "string",
                            "description": "File format (detected when omitted)",
                            "enum": ["nws", "rti"]
                        },
                        "source": { "type": "string", "description": "Label recorded on loaded units" }
                    },
                    "required": ["content"]
                }
            }
        ]
    })
}

pub fn call(server: &Server, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params.get("name")
        .and_then(|n| n.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    tracing::debug!(tool = name, "tool call");

    match name {
        "convert" => tool_convert(server, parse_args(args)?),
        "lookup_unit" => tool_lookup_unit(server, parse_args(args)?),
        "list_units" => tool_list_units(server, parse_args(args)?),
        "list_dimensions" => tool_list_dimensions(server),
        "are_compatible" => tool_are_compatible(server, parse_args(args)?),
        "output_format" => tool_output_format(server, parse_args(args)?),
        "load_units" => tool_load_units(server, parse_args(args)?),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

fn parse_args<T: DeserializeOwned>(args: JsonValue) -> Result<T, McpError> {
    serde_json::from_value(args).map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e)))
}

#[derive(Debug, Deserialize)]
struct ConvertArgs {
    from: String,
    to: String,
    value: Option<f64>,
}

fn tool_convert(server: &Server, args: ConvertArgs) -> Result<JsonValue, McpError> {
    let conversion = server.registry.convert(&args.from, &args.to)?;

    let text = match args.value {
        Some(v) => format!("{} {} = {} {}", v, args.from, conversion.apply(v), args.to),
        None => conversion.to_string(),
    };

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "data": conversion,
        "value": args.value.map(|v| conversion.apply(v))
    }))
}

#[derive(Debug, Deserialize)]
struct LookupArgs {
    abbreviation: String,
}

fn tool_lookup_unit(server: &Server, args: LookupArgs) -> Result<JsonValue, McpError> {
    let unit = server.registry.lookup(&args.abbreviation)?;
    let text = format!("{} ({}): dimension {}, 1 {} = {} base units",
        unit.abbreviation, unit.long_name, unit.dimension_abbreviation(), unit.abbreviation, unit.mult_factor);

    Ok(json!({ "content": [{ "type": "text", "text": text }], "data": unit }))
}

#[derive(Debug, Deserialize)]
struct ListUnitsArgs {
    dimension: String,
    system: Option<String>,
}

fn tool_list_units(server: &Server, args: ListUnitsArgs) -> Result<JsonValue, McpError> {
    let system = match args.system.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(token) => match token.parse::<UnitSystem>().unwrap_or_default() {
            UnitSystem::Unknown => {
                return Err(McpError::invalid_params(
                    format!("Unknown system '{}'. Expected ENGL, SI or ALL", token)));
            }
            system => Some(system),
        },
        None => None,
    };
    let units = server.registry.lookup_by_dimension(system, &args.dimension);
    let names: Vec<&str> = units.iter().map(|u| u.abbreviation.as_str()).collect();

    Ok(json!({
        "content": [{ "type": "text", "text": format!("{}: {}", args.dimension, names.join(", ")) }],
        "data": units
    }))
}

fn tool_list_dimensions(server: &Server) -> Result<JsonValue, McpError> {
    let dimensions = server.registry.dimensions().dimensions();
    Ok(json!({
        "content": [{ "type": "text", "text": format!("{} dimensions", dimensions.len()) }],
        "data": dimensions
    }))
}

#[derive(Debug, Deserialize)]
struct CompatibleArgs {
    units: Vec<String>,
    #[serde(default)]
    require_same: bool,
}

fn tool_are_compatible(server: &Server, args: CompatibleArgs) -> Result<JsonValue, McpError> {
    let compatible = server.registry.are_compatible(args.units.as_slice(), args.require_same);
    Ok(json!({
        "content": [{ "type": "text", "text": compatible.to_string() }],
        "data": compatible
    }))
}

#[derive(Debug, Deserialize)]
struct OutputFormatArgs {
    unit: String,
    width: Option<u32>,
    default_precision: Option<u32>,
    value: Option<f64>,
}

fn tool_output_format(server: &Server, args: OutputFormatArgs) -> Result<JsonValue, McpError> {
    let width = args.width.unwrap_or(server.config.format_width);
    let format = UnitFormat::for_unit(
        &server.registry,
        &args.unit,
        width,
        args.default_precision.unwrap_or(DEFAULT_PRECISION),
    );
    let formatted = args.value.map(|v| format.format_value(v));

    Ok(json!({
        "content": [{ "type": "text", "text": formatted.clone().unwrap_or_else(|| format.to_string()) }],
        "data": format,
        "formatted": formatted
    }))
}

#[derive(Debug, Deserialize)]
struct LoadArgs {
    content: String,
    format: Option<UnitsFileFormat>,
    source: Option<String>,
}

fn tool_load_units(server: &Server, args: LoadArgs) -> Result<JsonValue, McpError> {
    let format = args.format
        .or_else(|| UnitsFileFormat::detect(&args.content))
        .unwrap_or(UnitsFileFormat::Nws);
    let source = args.source.as_deref().unwrap_or(format.default_source());
    let report = format.load(&server.registry, &args.content, source);

    let text = format!("Loaded {} units ({} lines skipped)", report.units_loaded, report.diagnostics.len());
    Ok(json!({ "content": [{ "type": "text", "text": text }], "data": report }))
}
