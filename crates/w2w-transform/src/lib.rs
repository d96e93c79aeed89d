//! Polars frame transforms used to flatten relational data into wide tables.

pub mod join;
pub mod pivot;

pub use join::left_join;
pub use pivot::{
    ColumnOrder, PivotLabel, PivotSpec, flatten_pivot_columns, pivot_keys, pivot_labels,
    pivot_wide,
};
