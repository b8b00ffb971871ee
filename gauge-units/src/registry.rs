//! Unit registry and the conversion algorithm

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use crate::convert::ConversionResult;
use crate::dimension::{key, DimensionRegistry};
use crate::error::{Result, UnitError};
use crate::unit::{Unit, UnitSystem};

/// Additive factors at or below this magnitude are treated as noise
pub const ADD_FACTOR_THRESHOLD: f64 = 0.001;

#[derive(Debug, Default)]
struct Entries {
    units: Vec<Unit>,
    index: HashMap<String, usize>,
}

/// Registry of known units, each linked to a dimension of a shared `DimensionRegistry`
#[derive(Debug)]
pub struct UnitRegistry {
    dimensions: Arc<DimensionRegistry>,
    entries: RwLock<Entries>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new(Arc::new(DimensionRegistry::new()))
    }
}

impl UnitRegistry {
    pub fn new(dimensions: Arc<DimensionRegistry>) -> Self {
        UnitRegistry {
            dimensions,
            entries: RwLock::new(Entries::default()),
        }
    }

    /// The dimension registry units are validated against
    pub fn dimensions(&self) -> &Arc<DimensionRegistry> {
        &self.dimensions
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a unit, overwriting any unit with the same abbreviation
    ///
    /// The dimension linkage is resolved against the dimension registry. If
    /// the dimension is unknown the unit is still stored, with no dimension,
    /// and `UnknownDimension` is returned.
    pub fn upsert(&self, mut unit: Unit) -> Result<()> {
        let requested = unit.dimension_abbreviation().to_string();
        let linked = unit.set_dimension(&self.dimensions, &requested);

        let k = key(&unit.abbreviation);
        let mut entries = self.write();
        match entries.index.get(&k).copied() {
            Some(pos) => {
                tracing::debug!(abbreviation = %unit.abbreviation, "replacing unit");
                entries.units[pos] = unit;
            }
            None => {
                tracing::debug!(abbreviation = %unit.abbreviation, dimension = %requested, "adding unit");
                let pos = entries.units.len();
                entries.units.push(unit);
                entries.index.insert(k, pos);
            }
        }
        linked
    }

    /// Find a unit by abbreviation (case-insensitive)
    pub fn lookup(&self, abbreviation: &str) -> Result<Unit> {
        if abbreviation.trim().is_empty() {
            return Err(UnitError::unit_not_found(abbreviation));
        }
        let entries = self.read();
        entries.index.get(&key(abbreviation))
            .map(|&pos| entries.units[pos].clone())
            .ok_or_else(|| UnitError::unit_not_found(abbreviation))
    }

    /// All units of a dimension, optionally restricted to a measurement system
    pub fn lookup_by_dimension(&self, system: Option<UnitSystem>, dimension: &str) -> Vec<Unit> {
        self.read().units.iter()
            .filter(|u| u.dimension.as_ref().is_some_and(|d| d.matches(dimension)))
            .filter(|u| system.map_or(true, |s| u.system.admits(s)))
            .cloned()
            .collect()
    }

    /// The unit flagged as base for a dimension, if any
    pub fn base_unit(&self, dimension: &str) -> Option<Unit> {
        self.lookup_by_dimension(None, dimension)
            .into_iter()
            .find(|u| u.is_base)
    }

    /// Compute the factors converting values in `from` to values in `to`
    pub fn convert(&self, from: &str, to: &str) -> Result<ConversionResult> {
        let from_key = from.trim();
        let to_key = to.trim();

        if from_key.is_empty() && to_key.is_empty() {
            return Ok(ConversionResult::identity(from, to));
        }
        if key(from_key) == key(to_key) {
            return Ok(ConversionResult::identity(from, to));
        }

        let u1 = self.lookup(from_key)
            .map_err(|_| UnitError::UnitNotFound(from_key.to_string()))?;
        let u2 = self.lookup(to_key)
            .map_err(|_| UnitError::UnitNotFound(to_key.to_string()))?;

        let compatible = match (&u1.dimension, &u2.dimension) {
            (Some(d1), Some(d2)) => d1.matches(&d2.abbreviation),
            _ => false,
        };
        if !compatible {
            return Err(UnitError::DimensionMismatch {
                from: from_key.to_string(),
                to: to_key.to_string(),
                from_dimension: u1.dimension_abbreviation().to_string(),
                to_dimension: u2.dimension_abbreviation().to_string(),
            });
        }

        for unit in [&u1, &u2] {
            if !usable_factor(unit.mult_factor) {
                return Err(UnitError::InvalidFactor {
                    abbreviation: unit.abbreviation.clone(),
                    factor: unit.mult_factor,
                });
            }
        }

        let mult = u1.mult_factor / u2.mult_factor;
        let add = if u1.has_offset() || u2.has_offset() {
            (-u2.add_factor / u2.mult_factor) + (u1.add_factor / u2.mult_factor)
        } else {
            0.0
        };

        Ok(ConversionResult::new(from, to, mult, add))
    }

    /// Convert a single value between two units
    pub fn convert_value(&self, value: f64, from: &str, to: &str) -> Result<f64> {
        Ok(self.convert(from, to)?.apply(value))
    }

    /// Check that every unit in the list converts to/from the first one
    ///
    /// With `require_same`, each pair must also convert with the identity factors.
    pub fn are_compatible<S: AsRef<str>>(&self, units: &[S], require_same: bool) -> bool {
        let Some((first, rest)) = units.split_first() else {
            return true;
        };
        rest.iter().all(|other| match self.convert(first.as_ref(), other.as_ref()) {
            Ok(conv) => !require_same || conv.is_identity(),
            Err(_) => false,
        })
    }

    /// Snapshot of all units in registration order
    pub fn units(&self) -> Vec<Unit> {
        self.read().units.clone()
    }

    pub fn abbreviations(&self) -> Vec<String> {
        self.read().units.iter().map(|u| u.abbreviation.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every unit; the dimension registry is left as is
    pub fn clear(&self) {
        let mut entries = self.write();
        entries.units.clear();
        entries.index.clear();
    }
}

/// Multipliers are divisors in `convert`
pub(crate) fn usable_factor(factor: f64) -> bool {
    factor.is_finite() && factor != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dimension;

    const TOLERANCE: f64 = 1e-9;

    fn registry() -> UnitRegistry {
        let dims = Arc::new(DimensionRegistry::new());
        dims.upsert(Dimension::new("L", "LENGTH"));
        dims.upsert(Dimension::new("TEMP", "TEMPERATURE"));
        dims.upsert(Dimension::new("L3/T", "DISCHARGE"));

        let reg = UnitRegistry::new(dims);
        reg.upsert(Unit::with_factors("MM", "MILLIMETER", "L", 1.0, 0.0).as_base().with_system(UnitSystem::Si)).unwrap();
        reg.upsert(Unit::with_factors("KM", "KILOMETER", "L", 1_000_000.0, 0.0).with_system(UnitSystem::Si)).unwrap();
        reg.upsert(Unit::with_factors("FT", "FOOT", "L", 304.8, 0.0).with_system(UnitSystem::English)).unwrap();
        reg.upsert(Unit::with_factors("IN", "INCH", "L", 25.4, 0.0)).unwrap();
        reg.upsert(Unit::with_factors("DEGC", "DEGREE CENTIGRADE", "TEMP", 1.0, 0.0).as_base()).unwrap();
        reg.upsert(Unit::with_factors("DEGF", "DEGREE FAHRENHEIT", "TEMP", 0.555556, -17.8)).unwrap();
        reg.upsert(Unit::with_factors("CMS", "CUBIC METERS PER SECOND", "L3/T", 1.0, 0.0).as_base()).unwrap();
        reg
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_lookup() {
        let reg = registry();
        let unit = reg.lookup("km").unwrap();
        assert_eq!(unit.abbreviation, "KM");
        assert_eq!(unit.dimension.unwrap().long_name, "LENGTH");

        assert_eq!(reg.lookup("FURLONG"), Err(UnitError::unit_not_found("FURLONG")));
    }

    #[test]
    fn test_lookup_empty_registry() {
        let reg = UnitRegistry::default();
        assert!(reg.lookup("MM").is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_upsert_overwrites_by_key() {
        let reg = registry();
        let before = reg.len();
        reg.upsert(Unit::with_factors("ft", "FEET", "L", 304.8, 0.0).with_precision(4)).unwrap();

        assert_eq!(reg.len(), before);
        let unit = reg.lookup("FT").unwrap();
        assert_eq!(unit.long_name, "FEET");
        assert_eq!(unit.output_precision, 4);
        assert_eq!(reg.abbreviations()[2], "ft");
    }

    #[test]
    fn test_upsert_unknown_dimension_still_stores() {
        let reg = registry();
        let err = reg.upsert(Unit::with_factors("ACRE", "ACRE", "L2", 4046.86, 0.0)).unwrap_err();
        assert_eq!(err, UnitError::UnknownDimension("L2".to_string()));

        let unit = reg.lookup("ACRE").unwrap();
        assert!(unit.dimension.is_none());
        assert_eq!(unit.mult_factor, 4046.86);
    }

    #[test]
    fn test_identity_conversions() {
        let reg = registry();
        for abbrev in reg.abbreviations() {
            let conv = reg.convert(&abbrev, &abbrev).unwrap();
            assert!(conv.is_identity(), "{} should convert to itself", abbrev);
        }
        assert!(reg.convert("", "").unwrap().is_identity());
        // No registry lookup for equal abbreviations
        assert!(reg.convert(" parsec", "PARSEC ").unwrap().is_identity());
    }

    #[test]
    fn test_km_to_mm() {
        let reg = registry();
        let conv = reg.convert("KM", "MM").unwrap();
        assert_eq!(conv.mult_factor, 1_000_000.0);
        assert_eq!(conv.add_factor, 0.0);
        assert_eq!(conv.original_unit, "KM");
        assert_eq!(conv.new_unit, "MM");
    }

    #[test]
    fn test_inverse_factors() {
        let reg = registry();
        for (a, b) in [("KM", "FT"), ("IN", "MM"), ("DEGC", "DEGF")] {
            let forward = reg.convert(a, b).unwrap();
            let back = reg.convert(b, a).unwrap();
            assert!(approx(forward.mult_factor, 1.0 / back.mult_factor));
        }
    }

    #[test]
    fn test_temperature_literal_formula() {
        let reg = registry();
        let conv = reg.convert("DEGC", "DEGF").unwrap();
        assert!(approx(conv.mult_factor, 1.0 / 0.555556));
        assert!(approx(conv.add_factor, 17.8 / 0.555556));

        let conv = reg.convert("DEGF", "DEGC").unwrap();
        assert!(approx(conv.mult_factor, 0.555556));
        assert!(approx(conv.add_factor, -17.8));
        // 32 F is about 0 C
        assert!(conv.apply(32.0).abs() < 0.05);
    }

    #[test]
    fn test_small_add_factor_ignored() {
        let reg = registry();
        reg.upsert(Unit::with_factors("M", "METER", "L", 1000.0, 0.0005)).unwrap();
        let conv = reg.convert("M", "MM").unwrap();
        assert_eq!(conv.add_factor, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let reg = registry();
        let err = reg.convert("FT", "CMS").unwrap_err();
        assert_eq!(err, UnitError::DimensionMismatch {
            from: "FT".to_string(),
            to: "CMS".to_string(),
            from_dimension: "L".to_string(),
            to_dimension: "L3/T".to_string(),
        });
    }

    #[test]
    fn test_unlinked_unit_not_convertible() {
        let reg = registry();
        let _ = reg.upsert(Unit::with_factors("ACRE", "ACRE", "L2", 4046.86, 0.0));
        let _ = reg.upsert(Unit::with_factors("HECT", "HECTARE", "L2", 10000.0, 0.0));
        assert!(matches!(reg.convert("ACRE", "HECT"), Err(UnitError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_unit_not_found() {
        let reg = registry();
        assert_eq!(reg.convert("FT", "FURL"), Err(UnitError::UnitNotFound("FURL".to_string())));
        assert_eq!(reg.convert("", "FT"), Err(UnitError::UnitNotFound("".to_string())));
    }

    #[test]
    fn test_zero_or_nan_multiplier_not_convertible() {
        let reg = registry();
        reg.upsert(Unit::with_factors("ZERO", "ZERO", "L", 0.0, 0.0)).unwrap();
        reg.upsert(Unit::with_factors("NAN", "NAN", "L", f64::NAN, 0.0)).unwrap();

        let err = reg.convert("MM", "ZERO").unwrap_err();
        assert_eq!(err.code(), "INVALID_FACTOR");
        assert!(matches!(reg.convert("NAN", "MM"), Err(UnitError::InvalidFactor { .. })));
        assert!(!reg.are_compatible(&["MM", "ZERO"], false));
    }

    #[test]
    fn test_empty_abbreviation_never_found() {
        let reg = registry();
        reg.upsert(Unit::with_factors("", "NOTHING", "L", 5.0, 0.0)).unwrap();

        assert_eq!(reg.lookup(""), Err(UnitError::unit_not_found("")));
        assert_eq!(reg.convert("", "MM"), Err(UnitError::UnitNotFound(String::new())));
        assert!(reg.convert("", "").unwrap().is_identity());
    }

    #[test]
    fn test_convert_value() {
        let reg = registry();
        let value = reg.convert_value(2.0, "FT", "IN").unwrap();
        assert!(approx(value, 24.0));
    }

    #[test]
    fn test_are_compatible() {
        let reg = registry();
        assert!(reg.are_compatible::<&str>(&[], false));
        assert!(reg.are_compatible(&["NOPE"], true));
        assert!(reg.are_compatible(&["MM", "KM", "FT"], false));
        assert!(!reg.are_compatible(&["MM", "KM", "CMS"], false));
        assert!(!reg.are_compatible(&["MM", "NOPE"], false));

        assert!(!reg.are_compatible(&["MM", "KM"], true));
        assert!(reg.are_compatible(&["MM", "mm"], true));
        reg.upsert(Unit::with_factors("MILM", "MILLIMETRE", "L", 1.0, 0.0)).unwrap();
        assert!(reg.are_compatible(&["MM".to_string(), "MILM".to_string()], true));
    }

    #[test]
    fn test_lookup_by_dimension() {
        let reg = registry();
        let all: Vec<String> = reg.lookup_by_dimension(None, "l")
            .into_iter().map(|u| u.abbreviation).collect();
        assert_eq!(all, vec!["MM", "KM", "FT", "IN"]);

        // IN has no declared system so it passes any filter
        let si: Vec<String> = reg.lookup_by_dimension(Some(UnitSystem::Si), "L")
            .into_iter().map(|u| u.abbreviation).collect();
        assert_eq!(si, vec!["MM", "KM", "IN"]);

        let english: Vec<String> = reg.lookup_by_dimension(Some(UnitSystem::English), "L")
            .into_iter().map(|u| u.abbreviation).collect();
        assert_eq!(english, vec!["FT", "IN"]);

        assert!(reg.lookup_by_dimension(None, "MASS").is_empty());
    }

    #[test]
    fn test_base_unit() {
        let reg = registry();
        assert_eq!(reg.base_unit("TEMP").unwrap().abbreviation, "DEGC");
        assert!(reg.base_unit("MASS").is_none());
    }

    #[test]
    fn test_clear() {
        let reg = registry();
        reg.clear();
        assert!(reg.is_empty());
        assert!(!reg.dimensions().is_empty());
    }

    #[test]
    fn test_concurrent_reads() {
        let reg = Arc::new(registry());
        std::thread::scope(|s| {
            for _ in 0..4 {
                let reg = Arc::clone(&reg);
                s.spawn(move || {
                    for _ in 0..100 {
                        let conv = reg.convert("KM", "MM").unwrap();
                        assert_eq!(conv.mult_factor, 1_000_000.0);
                    }
                });
            }
            s.spawn(|| {
                for i in 0..50 {
                    let abbrev = format!("X{}", i);
                    reg.upsert(Unit::with_factors(&abbrev, "EXTRA", "L", i as f64 + 1.0, 0.0)).unwrap();
                }
            });
        });
        assert_eq!(reg.len(), 57);
    }
}
