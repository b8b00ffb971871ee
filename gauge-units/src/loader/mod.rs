//! Unit definition file loaders
//!
//! Two legacy text formats are supported:
//! - NWS fixed-column files (`*` comments, `* END` terminator)
//! - RTi pipe-delimited files (`#` comments)
//!
//! Loading never aborts on a bad line. Each line is parsed on its own; lines
//! that fail are skipped and reported as diagnostics in the `LoadReport`.

mod nws;
mod rti;

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::dimension::Dimension;
use crate::error::{Result, UnitError};
use crate::registry::{usable_factor, UnitRegistry};
use crate::unit::Unit;

pub use nws::{ENGLISH_ABBREVIATIONS, SI_ABBREVIATIONS};

/// Supported unit file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitsFileFormat {
    Nws,
    Rti,
}

impl UnitsFileFormat {
    /// Guess the format from the first data line: pipes mean RTi
    pub fn detect(text: &str) -> Option<UnitsFileFormat> {
        text.lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('*'))
            .map(|l| if l.contains('|') { UnitsFileFormat::Rti } else { UnitsFileFormat::Nws })
    }

    /// Label recorded as the `source` of units loaded without an explicit one
    pub fn default_source(&self) -> &'static str {
        match self {
            UnitsFileFormat::Nws => "NWS",
            UnitsFileFormat::Rti => "RTi",
        }
    }

    /// Load `text` in this format into the registry
    pub fn load(&self, registry: &UnitRegistry, text: &str, source: &str) -> LoadReport {
        match self {
            UnitsFileFormat::Nws => run(registry, text, *self, |n, l| nws::parse_line(n, l, source)),
            UnitsFileFormat::Rti => run(registry, text, *self, |n, l| rti::parse_line(n, l, source)),
        }
    }
}

impl fmt::Display for UnitsFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_source())
    }
}

/// Outcome of parsing one line
#[derive(Debug)]
pub(crate) enum Line {
    /// Comment or otherwise ignorable
    Skip,
    /// End-of-data marker
    Stop,
    Record(Unit),
}

/// A skipped record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub error: UnitError,
}

/// Summary of one load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub format: UnitsFileFormat,
    pub units_loaded: usize,
    /// Dimension abbreviations encountered, in first-seen order
    pub dimensions: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Records stored despite a problem, such as an unresolved dimension
    pub warnings: Vec<Diagnostic>,
}

impl LoadReport {
    fn new(format: UnitsFileFormat) -> Self {
        LoadReport {
            format,
            units_loaded: 0,
            dimensions: Vec::new(),
            diagnostics: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when no line was skipped
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn skip(&mut self, line: usize, text: &str, error: UnitError) {
        tracing::warn!(line, error = %error, "skipping {} record", self.format);
        self.diagnostics.push(Diagnostic {
            line,
            text: text.to_string(),
            error,
        });
    }

    /// Make sure the unit's dimension exists, then store the unit
    fn register(&mut self, registry: &UnitRegistry, unit: Unit, line: usize, text: &str) {
        let dimension = unit.dimension_abbreviation().to_string();
        if !dimension.is_empty() {
            let dimensions = registry.dimensions();
            if !dimensions.contains(&dimension) {
                dimensions.upsert(Dimension::new(&dimension, &dimension));
            }
            if !self.dimensions.iter().any(|d| d.eq_ignore_ascii_case(&dimension)) {
                self.dimensions.push(dimension);
            }
        }

        // upsert stores the unit even when the dimension link fails
        let linked = registry.upsert(unit);
        self.units_loaded += 1;
        if let Err(error) = linked {
            tracing::warn!(line, error = %error, "stored {} record without a dimension", self.format);
            self.warnings.push(Diagnostic {
                line,
                text: text.to_string(),
                error,
            });
        }
    }
}

fn run<F>(registry: &UnitRegistry, text: &str, format: UnitsFileFormat, mut parse: F) -> LoadReport
where
    F: FnMut(usize, &str) -> Result<Line>,
{
    let mut report = LoadReport::new(format);

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        match parse(line, raw) {
            Ok(Line::Skip) => {}
            Ok(Line::Stop) => break,
            Ok(Line::Record(unit)) => report.register(registry, unit, line, raw),
            Err(e) => report.skip(line, raw, e),
        }
    }

    tracing::info!(
        format = %format,
        units = report.units_loaded,
        dimensions = report.dimensions.len(),
        skipped = report.diagnostics.len(),
        "loaded unit definitions"
    );
    report
}

/// Load an NWS fixed-column unit file
pub fn load_nws(registry: &UnitRegistry, text: &str) -> LoadReport {
    UnitsFileFormat::Nws.load(registry, text, UnitsFileFormat::Nws.default_source())
}

/// Load an RTi pipe-delimited unit file
pub fn load_rti(registry: &UnitRegistry, text: &str) -> LoadReport {
    UnitsFileFormat::Rti.load(registry, text, UnitsFileFormat::Rti.default_source())
}

/// Load a unit file of either format, detected from its content
///
/// Text without any data line is treated as an (empty) NWS file.
pub fn load_units(registry: &UnitRegistry, text: &str) -> LoadReport {
    let format = UnitsFileFormat::detect(text).unwrap_or(UnitsFileFormat::Nws);
    format.load(registry, text, format.default_source())
}

/// Parse a multiplier; zero and non-finite values cannot be divided by
pub(crate) fn multiplier(line: usize, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(factor) if usable_factor(factor) => Ok(factor),
        _ => Err(UnitError::malformed(line, format!("invalid multiplier \"{}\"", value))),
    }
}

/// Shared helper for both formats: reject records without a key
pub(crate) fn require(line: usize, value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        Err(UnitError::malformed(line, format!("missing {}", what)))
    } else {
        Ok(())
    }
}
