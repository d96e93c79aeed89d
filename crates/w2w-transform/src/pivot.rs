//! Long-to-wide pivoting with two-level column labels.
//!
//! A pivot produces columns labelled `(outer, inner)`: index columns carry
//! their own name as the outer label and an empty inner label, pivoted
//! columns carry the value group as outer label and the pivoted key (a
//! classifier name, an age) as inner label. [`flatten_pivot_columns`]
//! collapses these into single-level names.

use std::collections::HashSet;

use polars::prelude::*;

/// Two-level column label of a pivoted table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PivotLabel {
    pub outer: String,
    pub inner: String,
}

impl PivotLabel {
    pub fn new(outer: impl Into<String>, inner: impl Into<String>) -> Self {
        Self {
            outer: outer.into(),
            inner: inner.into(),
        }
    }

    /// Label for an index column, which has no inner label.
    pub fn index(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }
}

/// Flattens two-level labels: the inner label when non-empty, else the outer.
pub fn flatten_pivot_columns(labels: &[PivotLabel]) -> Vec<String> {
    labels
        .iter()
        .map(|label| {
            if label.inner.is_empty() {
                label.outer.clone()
            } else {
                label.inner.clone()
            }
        })
        .collect()
}

/// Order of pivoted columns in the wide frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnOrder {
    /// First-seen order of the pivoted keys.
    #[default]
    Discovery,
    /// Ascending numeric order; non-numeric keys sort after numeric ones.
    NumericAscending,
}

/// Column roles of a long frame to pivot.
#[derive(Debug, Clone, Copy)]
pub struct PivotSpec<'a> {
    /// Entity key; one output row per distinct value.
    pub index: &'a str,
    /// Column whose distinct values become output columns.
    pub on: &'a str,
    /// Column holding the cell values.
    pub values: &'a str,
    pub order: ColumnOrder,
}

/// Distinct non-null keys of `on` in the requested order.
pub fn pivot_keys(on: &StringChunked, order: ColumnOrder) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys: Vec<String> = on
        .into_iter()
        .flatten()
        .filter(|key| seen.insert(*key))
        .map(str::to_string)
        .collect();
    if order == ColumnOrder::NumericAscending {
        keys.sort_by(|left, right| {
            match (left.parse::<f64>().ok(), right.parse::<f64>().ok()) {
                (Some(l), Some(r)) => l.total_cmp(&r),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }
    keys
}

/// Two-level labels of the frame [`pivot_wide`] produces for `keys`.
pub fn pivot_labels(spec: &PivotSpec<'_>, keys: &[String]) -> Vec<PivotLabel> {
    let mut labels = vec![PivotLabel::index(spec.index)];
    labels.extend(
        keys.iter()
            .map(|key| PivotLabel::new(spec.values, key.as_str())),
    );
    labels
}

/// Pivots a long frame to one row per distinct index value.
///
/// Rows come out in first-seen index order. Rows with a null `on` value are
/// ignored and a repeated `(index, on)` pair keeps its last value. Cells with
/// no source row are null.
pub fn pivot_wide(long: &DataFrame, spec: &PivotSpec<'_>) -> PolarsResult<DataFrame> {
    let keys = pivot_keys(long.column(spec.on)?.str()?, spec.order);
    if keys.is_empty() {
        return Ok(long.select([spec.index])?.head(Some(0)));
    }

    let names = flatten_pivot_columns(&pivot_labels(spec, &keys));
    let cells: Vec<Expr> = keys
        .iter()
        .zip(names.iter().skip(1))
        .map(|(key, name)| {
            col(spec.values)
                .filter(col(spec.on).eq(lit(key.as_str())))
                .last()
                .alias(name.as_str())
        })
        .collect();

    let wide = long
        .clone()
        .lazy()
        .filter(col(spec.on).is_not_null())
        .group_by_stable([col(spec.index)])
        .agg(cells)
        .collect()?;
    tracing::trace!(
        rows = wide.height(),
        columns = wide.width(),
        pivot = spec.on,
        "built pivot frame"
    );
    Ok(wide)
}
