//! Unit representation with conversion factors

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::dimension::{Dimension, DimensionRegistry};
use crate::error::{Result, UnitError};

/// Measurement system a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Unknown,
    English,
    #[serde(rename = "SI")]
    Si,
    All,
}

impl UnitSystem {
    /// Whether a unit declared with `self` should be returned for a query on `requested`
    ///
    /// `Unknown` and `All` on either side act as wildcards.
    pub fn admits(&self, requested: UnitSystem) -> bool {
        match (self, requested) {
            (UnitSystem::Unknown, _) | (_, UnitSystem::Unknown) => true,
            (UnitSystem::All, _) | (_, UnitSystem::All) => true,
            (declared, requested) => *declared == requested,
        }
    }
}

impl FromStr for UnitSystem {
    type Err = std::convert::Infallible;

    /// Parse a legacy system token; anything unrecognized is `Unknown`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "ENGL" | "ENGLISH" => UnitSystem::English,
            "SI" => UnitSystem::Si,
            "ALL" => UnitSystem::All,
            _ => UnitSystem::Unknown,
        })
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSystem::Unknown => write!(f, ""),
            UnitSystem::English => write!(f, "ENGL"),
            UnitSystem::Si => write!(f, "SI"),
            UnitSystem::All => write!(f, "ALL"),
        }
    }
}

/// Default number of decimals used when displaying values in a unit
pub const DEFAULT_OUTPUT_PRECISION: u32 = 2;

/// A concrete measurement unit
///
/// One unit of this type equals `mult_factor` base units of its dimension,
/// shifted by `add_factor` for affine dimensions such as temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Natural key, e.g. "CFS", "DEGF"
    pub abbreviation: String,
    /// Descriptive name, e.g. "CUBIC FEET PER SECOND"
    pub long_name: String,
    /// Dimension linkage; `None` when it could not be resolved
    pub dimension: Option<Dimension>,
    /// Whether this is the reference unit of its dimension
    pub is_base: bool,
    /// Decimals used when displaying values
    pub output_precision: u32,
    pub system: UnitSystem,
    pub mult_factor: f64,
    pub add_factor: f64,
    /// Where the definition came from (file label, "NWS", "RTi", ...)
    pub source: String,
}

impl Default for Unit {
    fn default() -> Self {
        Unit {
            abbreviation: String::new(),
            long_name: String::new(),
            dimension: None,
            is_base: false,
            output_precision: DEFAULT_OUTPUT_PRECISION,
            system: UnitSystem::Unknown,
            mult_factor: 1.0,
            add_factor: 0.0,
            source: String::new(),
        }
    }
}

impl Unit {
    /// Create a unit in the given dimension with identity factors
    ///
    /// The dimension is recorded by abbreviation only; the registry resolves
    /// it against its known dimensions on upsert.
    pub fn new(abbreviation: &str, long_name: &str, dimension: &str) -> Self {
        Unit {
            abbreviation: abbreviation.to_string(),
            long_name: long_name.to_string(),
            dimension: dimension_ref(dimension),
            ..Default::default()
        }
    }

    /// Create a unit with explicit conversion factors
    pub fn with_factors(
        abbreviation: &str,
        long_name: &str,
        dimension: &str,
        mult_factor: f64,
        add_factor: f64,
    ) -> Self {
        Unit {
            mult_factor,
            add_factor,
            ..Unit::new(abbreviation, long_name, dimension)
        }
    }

    /// Builder: record the definition source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Builder: set the measurement system
    pub fn with_system(mut self, system: UnitSystem) -> Self {
        self.system = system;
        self
    }

    /// Builder: set the display precision
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.output_precision = precision;
        self
    }

    /// Builder: mark as base unit of its dimension
    pub fn as_base(mut self) -> Self {
        self.is_base = true;
        self
    }

    /// Abbreviation of the linked dimension, empty when unset
    pub fn dimension_abbreviation(&self) -> &str {
        self.dimension.as_ref().map_or("", |d| d.abbreviation.as_str())
    }

    /// Whether conversions to/from this unit need an additive term
    pub fn has_offset(&self) -> bool {
        self.add_factor.abs() > crate::registry::ADD_FACTOR_THRESHOLD
    }

    /// Link this unit to a registered dimension
    ///
    /// On failure the linkage is cleared and the rest of the unit is untouched.
    pub fn set_dimension(&mut self, registry: &DimensionRegistry, abbreviation: &str) -> Result<()> {
        match registry.lookup(abbreviation) {
            Ok(dimension) => {
                self.dimension = Some(dimension);
                Ok(())
            }
            Err(_) => {
                self.dimension = None;
                Err(UnitError::UnknownDimension(abbreviation.to_string()))
            }
        }
    }
}

fn dimension_ref(abbreviation: &str) -> Option<Dimension> {
    if abbreviation.is_empty() {
        None
    } else {
        Some(Dimension::new(abbreviation, ""))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_parse() {
        assert_eq!("ENGL".parse::<UnitSystem>().unwrap(), UnitSystem::English);
        assert_eq!("english".parse::<UnitSystem>().unwrap(), UnitSystem::English);
        assert_eq!(" SI ".parse::<UnitSystem>().unwrap(), UnitSystem::Si);
        assert_eq!("All".parse::<UnitSystem>().unwrap(), UnitSystem::All);
        assert_eq!("".parse::<UnitSystem>().unwrap(), UnitSystem::Unknown);
        assert_eq!("metric".parse::<UnitSystem>().unwrap(), UnitSystem::Unknown);
    }

    #[test]
    fn test_system_admits() {
        assert!(UnitSystem::Si.admits(UnitSystem::Si));
        assert!(!UnitSystem::Si.admits(UnitSystem::English));
        assert!(UnitSystem::Unknown.admits(UnitSystem::English));
        assert!(UnitSystem::All.admits(UnitSystem::Si));
        assert!(UnitSystem::English.admits(UnitSystem::All));
    }

    #[test]
    fn test_builders() {
        let unit = Unit::with_factors("DEGF", "DEGREE FAHRENHEIT", "TEMP", 0.555556, -17.8)
            .with_system(UnitSystem::English)
            .with_precision(1)
            .with_source("NWS");

        assert_eq!(unit.dimension_abbreviation(), "TEMP");
        assert_eq!(unit.output_precision, 1);
        assert_eq!(unit.source, "NWS");
        assert!(!unit.is_base);
        assert!(unit.has_offset());
    }

    #[test]
    fn test_default_unit() {
        let unit = Unit::default();
        assert_eq!(unit.dimension_abbreviation(), "");
        assert_eq!(unit.mult_factor, 1.0);
        assert_eq!(unit.output_precision, DEFAULT_OUTPUT_PRECISION);
        assert!(!unit.has_offset());
    }

    #[test]
    fn test_set_dimension() {
        let dims = DimensionRegistry::new();
        dims.upsert(Dimension::new("L", "LENGTH"));

        let mut unit = Unit::new("FT", "FOOT", "");
        unit.set_dimension(&dims, "l").unwrap();
        assert_eq!(unit.dimension, Some(Dimension::new("L", "LENGTH")));

        let err = unit.set_dimension(&dims, "AREA").unwrap_err();
        assert_eq!(err, UnitError::UnknownDimension("AREA".to_string()));
        assert!(unit.dimension.is_none());
        assert_eq!(unit.abbreviation, "FT");
    }
}
