//! Common utilities shared across report generators.

use crate::facts::hosting::COLUMNS;

/// Input columns carried into the output, as `(index, name)` pairs.
///
/// Columns whose name clashes with a derived metric column are dropped; the derived
/// value takes their place.
pub fn passthrough_columns(columns: &[String]) -> Vec<(usize, &str)> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, name)| !COLUMNS.contains(&name.as_str()))
        .map(|(index, name)| (index, name.as_str()))
        .collect()
}
