//! Matrix result aggregation: configuration keys, the result table, and the
//! collection state machine that fills it.

pub mod aggregator;
pub mod order;
pub mod parser;
pub mod report;
pub mod window;

use std::collections::BTreeMap;

use thiserror::Error;

pub use self::aggregator::{collect, collect_with, Aggregator, AggregatorState, Collection, Observation, StopReason};
pub use self::order::AxisOrder;
pub use self::parser::{DescriptionParser, ParsedDescription};
pub use self::window::{Clock, FixedClock, ReportingWindow, Staleness, SystemClock};

/// Why a run description could not be turned into a configuration result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("run has no description")]
    MissingDescription,

    #[error("could not parse description: {description:?}")]
    Unrecognized { description: String },
}

/// A table cannot be laid out without a total order on both axes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderingError {
    #[error("{axis} value {value:?} has no configured ordering weight")]
    UnknownValue { axis: String, value: String },
}

/// The reporting window start cannot be represented.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("lookback of {hours} hours reaches past the supported calendar range")]
    LookbackOutOfRange { hours: i64 },
}

/// One cell of the matrix: (axis-1 value, axis-2 value), e.g. (platform, version).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigurationKey {
    pub axis1: String,
    pub axis2: String,
}

impl ConfigurationKey {
    pub fn new(axis1: impl Into<String>, axis2: impl Into<String>) -> Self {
        Self {
            axis1: axis1.into(),
            axis2: axis2.into(),
        }
    }
}

impl std::fmt::Display for ConfigurationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.axis1, self.axis2)
    }
}

/// Outcome recorded for a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEntry {
    /// Outcome text from a run inside the reporting window.
    Status(String),
    /// The newest run for this configuration predates the reporting window.
    Outdated,
}

impl ResultEntry {
    /// Text shown in a table cell.
    pub fn display<'a>(&'a self, outdated_marker: &'a str) -> &'a str {
        match self {
            ResultEntry::Status(s) => s,
            ResultEntry::Outdated => outdated_marker,
        }
    }
}

/// Write-once mapping from configuration to result.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    entries: BTreeMap<ConfigurationKey, ResultEntry>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless `key` already has one. Returns true if the entry was new.
    pub fn try_insert(&mut self, key: ConfigurationKey, entry: ResultEntry) -> bool {
        match self.entries.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn get(&self, key: &ConfigurationKey) -> Option<&ResultEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConfigurationKey, &ResultEntry)> {
        self.entries.iter()
    }

    /// Distinct axis-1 values present in the table.
    pub fn axis1_values(&self) -> Vec<String> {
        let mut values: Vec<String> = self.entries.keys().map(|k| k.axis1.clone()).collect();
        values.dedup();
        values
    }

    /// Distinct axis-2 values present anywhere in the table.
    pub fn axis2_values(&self) -> Vec<String> {
        let mut values: Vec<String> = self.entries.keys().map(|k| k.axis2.clone()).collect();
        values.sort();
        values.dedup();
        values
    }
}
