//! Gauge Units - Unit Registry and Conversion Engine
//!
//! Models physical dimensions and the units that belong to them, computes
//! multiplicative/additive conversion factors between compatible units and
//! loads definitions from the NWS fixed-column and RTi pipe-delimited files.
//!
//! Components:
//! - `DimensionRegistry`: known dimensions (L, TEMP, L3/T, ...)
//! - `UnitRegistry`: known units and the conversion algorithm
//! - `ConversionResult`: `new = old * mult_factor + add_factor`
//! - `UnitFormat`: fixed-point display width and precision
//!
//! ```no_run
//! use std::sync::Arc;
//! use gauge_units::{DimensionRegistry, UnitRegistry, load_units};
//!
//! let registry = UnitRegistry::new(Arc::new(DimensionRegistry::new()));
//! let report = load_units(&registry, "L|BASE|MM|SI|MILLIMETER|2|1.|0.|\nL|OTHR|IN|ENGL|INCH|2|25.4|0.|");
//! assert!(report.is_clean());
//! let conv = registry.convert("IN", "MM").unwrap();
//! assert_eq!(conv.apply(1.0), 25.4);
//! ```

mod error;
mod dimension;
mod unit;
mod registry;
mod convert;
mod format;
mod loader;

pub use error::{RegistryKind, Result, UnitError};
pub use dimension::{Dimension, DimensionRegistry};
pub use unit::{Unit, UnitSystem, DEFAULT_OUTPUT_PRECISION};
pub use registry::{UnitRegistry, ADD_FACTOR_THRESHOLD};
pub use convert::ConversionResult;
pub use format::{UnitFormat, DEFAULT_PRECISION, DEFAULT_WIDTH};
pub use loader::{
    load_nws, load_rti, load_units, Diagnostic, LoadReport, UnitsFileFormat,
    ENGLISH_ABBREVIATIONS, SI_ABBREVIATIONS,
};
