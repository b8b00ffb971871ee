//! Physical dimensions and the registry that holds them
//!
//! A dimension is a quantity category such as length (`L`), temperature
//! (`TEMP`) or discharge (`L3/T`). Abbreviations are the natural key and are
//! matched case-insensitively.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Serialize, Deserialize};
use crate::error::{Result, UnitError};

/// A physical quantity category identified by an abbreviation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    /// Short key, e.g. "L", "TEMP"
    pub abbreviation: String,
    /// Descriptive name, e.g. "LENGTH"
    pub long_name: String,
}

impl Dimension {
    pub fn new(abbreviation: &str, long_name: &str) -> Self {
        Dimension {
            abbreviation: abbreviation.to_string(),
            long_name: long_name.to_string(),
        }
    }

    /// Case-insensitive comparison of the natural key
    pub fn matches(&self, abbreviation: &str) -> bool {
        key(&self.abbreviation) == key(abbreviation)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation)
    }
}

/// Normalized registry key for an abbreviation
pub(crate) fn key(abbreviation: &str) -> String {
    abbreviation.to_uppercase()
}

#[derive(Debug, Default)]
struct Entries {
    dimensions: Vec<Dimension>,
    index: HashMap<String, usize>,
}

/// Registry of known dimensions
///
/// Upserts take the write lock, lookups share the read lock, so a registry
/// wrapped in an `Arc` can be loaded from one thread and queried from many.
#[derive(Debug, Default)]
pub struct DimensionRegistry {
    entries: RwLock<Entries>,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a dimension, replacing in place any entry with the same abbreviation
    pub fn upsert(&self, dimension: Dimension) {
        let k = key(&dimension.abbreviation);
        let mut entries = self.write();
        match entries.index.get(&k).copied() {
            Some(pos) => {
                tracing::debug!(abbreviation = %dimension.abbreviation, "replacing dimension");
                entries.dimensions[pos] = dimension;
            }
            None => {
                tracing::debug!(abbreviation = %dimension.abbreviation, "adding dimension");
                let pos = entries.dimensions.len();
                entries.dimensions.push(dimension);
                entries.index.insert(k, pos);
            }
        }
    }

    /// Find a dimension by abbreviation (case-insensitive)
    pub fn lookup(&self, abbreviation: &str) -> Result<Dimension> {
        if abbreviation.is_empty() {
            return Err(UnitError::dimension_not_found(abbreviation));
        }
        let entries = self.read();
        entries.index.get(&key(abbreviation))
            .map(|&pos| entries.dimensions[pos].clone())
            .ok_or_else(|| UnitError::dimension_not_found(abbreviation))
    }

    pub fn contains(&self, abbreviation: &str) -> bool {
        self.lookup(abbreviation).is_ok()
    }

    /// Snapshot of all dimensions in registration order
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.read().dimensions.clone()
    }

    pub fn len(&self) -> usize {
        self.read().dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.write();
        entries.dimensions.clear();
        entries.index.clear();
    }
}
