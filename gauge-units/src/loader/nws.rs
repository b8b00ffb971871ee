//! NWS fixed-column unit records
//!
//! ```text
//! cols  0-3   dimension
//! cols  5-8   BASE or OTHR
//! cols 10-13  abbreviation
//! cols 16-51  long name
//! col  52     output precision (blank = 3)
//! cols 54-63  multiplier to the base unit
//! cols 64-    additive offset, TEMP dimension only
//! ```

use crate::error::{Result, UnitError};
use crate::unit::{Unit, UnitSystem};
use super::{multiplier as parse_multiplier, require, Line};

/// Abbreviations classified as English units
pub const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "ACFT", "CFS", "CFSD", "DEGF", "FT", "FT/S", "FT2", "FT3", "GAL", "IN",
    "IN/D", "IN/H", "KAF", "KCFS", "MCFD", "MGD", "MI", "MI2", "MPH", "YD",
];

/// Abbreviations classified as SI units
pub const SI_ABBREVIATIONS: &[&str] = &[
    "CM", "CMS", "CMSD", "DEGC", "DEGK", "HA", "KM", "KM2", "L", "M",
    "M/S", "M2", "M3", "MCM", "MM", "MM/D", "MM/H", "TCMS",
];

const DEFAULT_PRECISION: u32 = 3;

/// Column range of each field, `(start, len)`
const DIMENSION: (usize, usize) = (0, 4);
const FLAG: (usize, usize) = (5, 4);
const ABBREVIATION: (usize, usize) = (10, 4);
const LONG_NAME: (usize, usize) = (16, 36);
const PRECISION: (usize, usize) = (52, 1);
const MULTIPLIER: (usize, usize) = (54, 10);
const OFFSET_START: usize = 64;

pub(crate) fn parse_line(line: usize, text: &str, source: &str) -> Result<Line> {
    if text.starts_with('*') {
        let marker: String = text.chars().take(5).collect();
        if marker.eq_ignore_ascii_case("* END") {
            return Ok(Line::Stop);
        }
        return Ok(Line::Skip);
    }

    let chars: Vec<char> = text.chars().collect();
    let dimension = field(&chars, DIMENSION);
    let flag = field(&chars, FLAG);
    let abbreviation = field(&chars, ABBREVIATION);
    let long_name = field(&chars, LONG_NAME);
    let precision = field(&chars, PRECISION);
    let multiplier = field(&chars, MULTIPLIER);

    require(line, &dimension, "dimension")?;
    require(line, &abbreviation, "abbreviation")?;
    require(line, &multiplier, "multiplier")?;

    let precision = if precision.is_empty() {
        DEFAULT_PRECISION
    } else {
        precision.parse()
            .map_err(|_| UnitError::malformed(line, format!("invalid precision \"{}\"", precision)))?
    };
    let mult_factor = parse_multiplier(line, &multiplier)?;

    let add_factor = if dimension.eq_ignore_ascii_case("TEMP") {
        let offset: String = chars.iter().skip(OFFSET_START).collect();
        let offset = offset.trim();
        if offset.is_empty() {
            0.0
        } else {
            offset.parse::<f64>()
                .map_err(|_| UnitError::malformed(line, format!("invalid offset \"{}\"", offset)))?
        }
    } else {
        0.0
    };

    let mut unit = Unit::with_factors(&abbreviation, &long_name, &dimension, mult_factor, add_factor)
        .with_precision(precision)
        .with_system(system_for(&abbreviation))
        .with_source(source);
    unit.is_base = flag.eq_ignore_ascii_case("BASE");

    Ok(Line::Record(unit))
}

/// Trimmed contents of a fixed-width column range; short lines yield empty fields
fn field(chars: &[char], (start, len): (usize, usize)) -> String {
    chars.iter()
        .skip(start)
        .take(len)
        .collect::<String>()
        .trim()
        .to_string()
}

fn system_for(abbreviation: &str) -> UnitSystem {
    let known = |list: &[&str]| list.iter().any(|a| a.eq_ignore_ascii_case(abbreviation));
    if known(ENGLISH_ABBREVIATIONS) {
        UnitSystem::English
    } else if known(SI_ABBREVIATIONS) {
        UnitSystem::Si
    } else {
        UnitSystem::All
    }
}
