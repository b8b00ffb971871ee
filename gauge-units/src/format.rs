//! Fixed-point display formats (`%<width>.<precision>f`)

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::registry::UnitRegistry;

pub const DEFAULT_WIDTH: u32 = 10;
pub const DEFAULT_PRECISION: u32 = 2;

/// Width and precision used to render values, with the equivalent C-style format string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFormat {
    pub format_string: String,
    pub precision: u32,
    pub width: u32,
}

impl Default for UnitFormat {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_PRECISION)
    }
}

impl UnitFormat {
    /// Build from width and precision; a zero width leaves the width out
    pub fn new(width: u32, precision: u32) -> Self {
        let format_string = if width > 0 {
            format!("%{}.{}f", width, precision)
        } else {
            format!("%.{}f", precision)
        };
        UnitFormat {
            format_string,
            precision,
            width,
        }
    }

    /// Recover width and precision from an existing format string
    ///
    /// Digits right before the decimal point are the width, digits right after
    /// it the precision. Without a decimal point the digits before the
    /// conversion character are the width. Missing digits read as 0.
    pub fn parse(format_string: &str) -> Self {
        let (width, precision) = match format_string.find('.') {
            Some(point) => (
                trailing_number(&format_string[..point]),
                leading_number(&format_string[point + 1..]),
            ),
            None => {
                let directive = format_string.find('%').map_or(format_string, |p| &format_string[p + 1..]);
                let end = directive.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(directive.len());
                (trailing_number(&directive[..end]), 0)
            }
        };
        UnitFormat {
            format_string: format_string.to_string(),
            precision,
            width,
        }
    }

    /// Format for values displayed in a registered unit
    ///
    /// Uses the unit's output precision; when the unit is not registered the
    /// default precision is used instead.
    pub fn for_unit(registry: &UnitRegistry, abbreviation: &str, width: u32, default_precision: u32) -> Self {
        match registry.lookup(abbreviation) {
            Ok(unit) => Self::new(width, unit.output_precision),
            Err(e) => {
                tracing::warn!(unit = abbreviation, error = %e, "using default output precision {}", default_precision);
                Self::new(width, default_precision)
            }
        }
    }

    /// Render a value right-aligned in `width` columns with `precision` decimals
    pub fn format_value(&self, value: f64) -> String {
        format!("{:>width$.prec$}", value, width = self.width as usize, prec = self.precision as usize)
    }
}

impl fmt::Display for UnitFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_string)
    }
}

fn trailing_number(s: &str) -> u32 {
    let start = s.rfind(|c: char| !c.is_ascii_digit()).map_or(0, |i| i + 1);
    s[start..].parse().unwrap_or(0)
}

fn leading_number(s: &str) -> u32 {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Unit, Dimension, DimensionRegistry};
    use std::sync::Arc;

    #[test]
    fn test_new() {
        assert_eq!(UnitFormat::new(10, 3).format_string, "%10.3f");
        assert_eq!(UnitFormat::new(0, 1).format_string, "%.1f");
        assert_eq!(UnitFormat::default().format_string, "%10.2f");
    }

    #[test]
    fn test_round_trip() {
        let fmt = UnitFormat::new(10, 3);
        let parsed = UnitFormat::parse(&fmt.format_string);
        assert_eq!(parsed.width, 10);
        assert_eq!(parsed.precision, 3);
        assert_eq!(parsed, fmt);

        let parsed = UnitFormat::parse("%.4f");
        assert_eq!(UnitFormat::new(parsed.width, parsed.precision).format_string, "%.4f");
    }

    #[test]
    fn test_parse_missing_digits() {
        let fmt = UnitFormat::parse("%8.f");
        assert_eq!((fmt.width, fmt.precision), (8, 0));

        let fmt = UnitFormat::parse("%12f");
        assert_eq!((fmt.width, fmt.precision), (12, 0));

        let fmt = UnitFormat::parse("%f");
        assert_eq!((fmt.width, fmt.precision), (0, 0));

        let fmt = UnitFormat::parse("");
        assert_eq!((fmt.width, fmt.precision), (0, 0));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(UnitFormat::new(10, 3).format_value(3.14159), "     3.142");
        assert_eq!(UnitFormat::new(0, 1).format_value(-2.26), "-2.3");
        assert_eq!(UnitFormat::new(4, 0).format_value(12345.6), "12346");
    }

    #[test]
    fn test_for_unit() {
        let dims = Arc::new(DimensionRegistry::new());
        dims.upsert(Dimension::new("L3/T", "DISCHARGE"));
        let reg = UnitRegistry::new(dims);
        reg.upsert(Unit::new("CFS", "CUBIC FEET PER SECOND", "L3/T").with_precision(0)).unwrap();

        let fmt = UnitFormat::for_unit(&reg, "cfs", 8, DEFAULT_PRECISION);
        assert_eq!(fmt.format_string, "%8.0f");

        let fmt = UnitFormat::for_unit(&reg, "KCFS", 8, 3);
        assert_eq!(fmt.precision, 3);
        assert_eq!(fmt.width, 8);
    }
}
