//! Named statistic registry.
//!
//! Burst statistics are chosen per parameter in configuration ("mean",
//! "median", "std", "mad", ...). The registry turns those names into pure
//! functions; nothing is evaluated from text at runtime.

use std::collections::BTreeMap;
use thiserror::Error;

use super::descriptive;

/// A pure statistic over a slice of samples (NaN = missing).
pub type StatisticFn = fn(&[f64]) -> f64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown statistic '{name}' (known: {known})")]
pub struct UnknownStatistic {
    pub name: String,
    pub known: String,
}

/// Map from symbolic name to statistic function.
#[derive(Clone)]
pub struct StatisticRegistry {
    entries: BTreeMap<String, StatisticFn>,
}

impl std::fmt::Debug for StatisticRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for StatisticRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl StatisticRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in statistic.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("mean", descriptive::mean);
        registry.register("median", descriptive::median);
        registry.register("std", descriptive::std_dev);
        registry.register("var", descriptive::variance);
        registry.register("mad", descriptive::mad);
        registry.register("min", descriptive::min);
        registry.register("max", descriptive::max);
        registry.register("range", descriptive::range);
        registry.register("iqr", descriptive::iqr);
        registry
    }

    /// Register (or replace) a statistic under `name`. Names are case-insensitive.
    pub fn register(&mut self, name: &str, f: StatisticFn) {
        self.entries.insert(name.to_lowercase(), f);
    }

    pub fn get(&self, name: &str) -> Result<StatisticFn, UnknownStatistic> {
        self.entries
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| UnknownStatistic {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// Evaluate a named statistic.
    pub fn apply(&self, name: &str, samples: &[f64]) -> Result<f64, UnknownStatistic> {
        Ok(self.get(name)?(samples))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
