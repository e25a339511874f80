//! Sparse result table keyed by (load level, variant name).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Sparse two-dimensional table of measurements.
///
/// Rows are keyed by `R` (ascending), columns by variant name (lexicographic).
/// Rows and columns come into existence on first insertion; looking up a cell
/// that was never written yields `None`.
#[derive(Debug, Clone, Serialize)]
pub struct ResultTable<R: Ord, V> {
    parallelism: usize,
    row_index_name: String,
    columns: BTreeSet<String>,
    rows: BTreeMap<R, BTreeMap<String, V>>,
}

/// Requests per second keyed by request count.
pub type ThroughputTable = ResultTable<usize, f64>;

impl<R: Ord + Copy, V: Copy> ResultTable<R, V> {
    pub fn new(parallelism: usize, row_index_name: impl Into<String>) -> Self {
        Self {
            parallelism,
            row_index_name: row_index_name.into(),
            columns: BTreeSet::new(),
            rows: BTreeMap::new(),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn row_index_name(&self) -> &str {
        &self.row_index_name
    }

    /// Record `value` for column `name` at row `index`, replacing any previous value.
    pub fn add_measurement(&mut self, name: impl Into<String>, index: R, value: V) {
        let name = name.into();
        self.columns.insert(name.clone());
        self.rows.entry(index).or_default().insert(name, value);
    }

    pub fn value(&self, name: &str, index: R) -> Option<V> {
        self.rows.get(&index).and_then(|row| row.get(name)).copied()
    }

    /// Column names, sorted lexicographically.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Row keys, sorted ascending.
    pub fn row_index(&self) -> Vec<R> {
        self.rows.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }
}
