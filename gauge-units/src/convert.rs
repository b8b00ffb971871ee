//! Result of a unit-to-unit conversion

use std::fmt;
use serde::{Serialize, Deserialize};

/// Coefficients converting a value in `original_unit` to `new_unit`
///
/// `new = original * mult_factor + add_factor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub original_unit: String,
    pub new_unit: String,
    pub mult_factor: f64,
    pub add_factor: f64,
}

impl ConversionResult {
    pub fn new(original_unit: &str, new_unit: &str, mult_factor: f64, add_factor: f64) -> Self {
        ConversionResult {
            original_unit: original_unit.to_string(),
            new_unit: new_unit.to_string(),
            mult_factor,
            add_factor,
        }
    }

    /// Conversion that leaves values unchanged
    pub fn identity(original_unit: &str, new_unit: &str) -> Self {
        Self::new(original_unit, new_unit, 1.0, 0.0)
    }

    pub fn is_identity(&self) -> bool {
        self.mult_factor == 1.0 && self.add_factor == 0.0
    }

    /// Convert a value expressed in the original unit
    pub fn apply(&self, value: f64) -> f64 {
        value * self.mult_factor + self.add_factor
    }
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: x * {} + {}",
            self.original_unit, self.new_unit, self.mult_factor, self.add_factor)
    }
}
