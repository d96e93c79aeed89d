//! Scoped access to GCBM input databases.

use std::path::Path;

use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row};

use crate::error::{ExtractError, Result};

/// Opens an existing input database without write access.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs `f` against a connection that is closed as soon as `f` returns.
pub fn with_input_db<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    let connection = open_read_only(path)?;
    tracing::debug!(path = %path.display(), "opened input database");
    let result = f(&connection);
    if let Err((_, error)) = connection.close() {
        tracing::warn!(path = %path.display(), %error, "failed to close input database");
    }
    result
}

/// Runs `sql` and collects the result as a frame of nullable text columns
/// named after the query's result columns.
pub(crate) fn query_frame(
    connection: &Connection,
    query: &'static str,
    sql: &str,
) -> Result<DataFrame> {
    let schema_err = |source| ExtractError::Schema { query, source };
    let mut statement = connection.prepare(sql).map_err(schema_err)?;
    let names: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = names.len();
    let rows = statement
        .query_map([], |row| read_cells(row, width))
        .map_err(schema_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(schema_err)?;

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
    for row in rows {
        for (column, cell) in values.iter_mut().zip(row) {
            column.push(cell);
        }
    }
    let columns: Vec<Column> = names
        .iter()
        .zip(values)
        .map(|(name, cells)| Series::new(name.as_str().into(), cells).into())
        .collect();
    tracing::debug!(query, columns = width, "queried input database");
    DataFrame::new(columns).map_err(|source| ExtractError::Frame {
        table: query,
        source,
    })
}

fn read_cells(row: &Row<'_>, width: usize) -> rusqlite::Result<Vec<Option<String>>> {
    (0..width)
        .map(|index| row.get::<_, Value>(index).map(value_to_cell))
        .collect()
}

/// Renders a SQLite value as a CSV cell; NULL becomes an empty cell.
pub(crate) fn value_to_cell(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(value) => Some(value.to_string()),
        Value::Real(value) => Some(value.to_string()),
        Value::Text(value) => Some(value),
        Value::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
