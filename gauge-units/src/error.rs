//! Error type shared by the registries, the conversion engine and the loaders

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Which registry a failed lookup was made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Dimension,
    Unit,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKind::Dimension => write!(f, "dimension"),
            RegistryKind::Unit => write!(f, "unit"),
        }
    }
}

/// Errors raised by registry lookups, conversions and record parsing
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum UnitError {
    /// Abbreviation absent from a registry
    #[error("no {kind} registered for \"{abbreviation}\"")]
    NotFound {
        kind: RegistryKind,
        abbreviation: String,
    },

    /// A unit references a dimension that has not been registered
    #[error("unknown dimension \"{0}\"")]
    UnknownDimension(String),

    /// One side of a conversion could not be resolved
    #[error("cannot convert: unit \"{0}\" is not registered")]
    UnitNotFound(String),

    /// Conversion requested across incompatible dimensions
    #[error("cannot convert {from} ({from_dimension}) to {to} ({to_dimension}): incompatible dimensions")]
    DimensionMismatch {
        from: String,
        to: String,
        from_dimension: String,
        to_dimension: String,
    },

    /// A unit's multiplier cannot take part in a conversion
    #[error("cannot convert with unit \"{abbreviation}\": multiplier {factor} is zero or not finite")]
    InvalidFactor {
        abbreviation: String,
        factor: f64,
    },

    /// A single input line could not be parsed
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord {
        line: usize,
        reason: String,
    },
}

impl UnitError {
    pub fn dimension_not_found(abbreviation: impl Into<String>) -> Self {
        UnitError::NotFound {
            kind: RegistryKind::Dimension,
            abbreviation: abbreviation.into(),
        }
    }

    pub fn unit_not_found(abbreviation: impl Into<String>) -> Self {
        UnitError::NotFound {
            kind: RegistryKind::Unit,
            abbreviation: abbreviation.into(),
        }
    }

    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        UnitError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Machine-readable code, used when errors cross the server boundary
    pub fn code(&self) -> &'static str {
        match self {
            UnitError::NotFound { .. } => "NOT_FOUND",
            UnitError::UnknownDimension(_) => "UNKNOWN_DIMENSION",
            UnitError::UnitNotFound(_) => "UNIT_NOT_FOUND",
            UnitError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            UnitError::InvalidFactor { .. } => "INVALID_FACTOR",
            UnitError::MalformedRecord { .. } => "MALFORMED_RECORD",
        }
    }
}

pub type Result<T, E = UnitError> = std::result::Result<T, E>;
