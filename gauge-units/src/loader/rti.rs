//! RTi pipe-delimited unit records
//!
//! `DIMENSION|BASE or OTHR|ABBREV|SYSTEM|LONG NAME|PRECISION|MULT|ADD|`

use crate::error::{Result, UnitError};
use crate::unit::{Unit, UnitSystem, DEFAULT_OUTPUT_PRECISION};
use super::{multiplier as parse_multiplier, require, Line};

const FIELD_COUNT: usize = 8;

pub(crate) fn parse_line(line: usize, text: &str, source: &str) -> Result<Line> {
    let text = text.trim();
    if text.starts_with('#') {
        return Ok(Line::Skip);
    }

    let body = text.strip_suffix('|').unwrap_or(text);
    let fields: Vec<&str> = body.split('|').map(str::trim).collect();
    if fields.len() < FIELD_COUNT {
        return Err(UnitError::malformed(
            line,
            format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
        ));
    }

    let [dimension, flag, abbreviation, system, long_name, precision, multiplier, offset] =
        [fields[0], fields[1], fields[2], fields[3], fields[4], fields[5], fields[6], fields[7]];

    require(line, dimension, "dimension")?;
    require(line, abbreviation, "abbreviation")?;

    let mult_factor = parse_multiplier(line, multiplier)?;
    let output_precision = precision.parse().unwrap_or(DEFAULT_OUTPUT_PRECISION);
    let add_factor = offset.parse::<f64>().unwrap_or(0.0);
    let system: UnitSystem = system.parse().unwrap_or_default();

    let mut unit = Unit::with_factors(abbreviation, long_name, dimension, mult_factor, add_factor)
        .with_precision(output_precision)
        .with_system(system)
        .with_source(source);
    unit.is_base = flag.eq_ignore_ascii_case("BASE");

    Ok(Line::Record(unit))
}
