//! Sheet-level access to spreadsheet workbooks.
//!
//! The first row of every sheet is its header row.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Sheets, open_workbook_auto};

use crate::error::{IngestError, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Empty cells and whitespace-only text are blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering; whole floats render without a fraction.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(format_number(*value)),
            Self::Bool(value) => Some(value.to_string()),
        }
    }

    /// Integer value; fractional numbers truncate toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            Self::Text(text) => {
                let trimmed = text.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|value| value.is_finite())
                        .map(|value| value.trunc() as i64)
                })
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Header row plus data rows of one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell at `(row, column)`, treating short rows as blank-padded.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Source of named sheets.
pub trait WorkbookSource {
    fn sheet(&mut self, name: &str) -> Result<SheetTable>;
}

/// Excel (`.xls`, `.xlsx`, `.xlsb`) or OpenDocument workbook on disk.
pub struct ExcelWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl ExcelWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path).map_err(|error| IngestError::Workbook {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkbookSource for ExcelWorkbook {
    fn sheet(&mut self, name: &str) -> Result<SheetTable> {
        if !self.sheets.sheet_names().iter().any(|sheet| sheet == name) {
            return Err(IngestError::SheetNotFound {
                sheet: name.to_string(),
            });
        }
        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|error| IngestError::Workbook {
                path: self.path.clone(),
                message: error.to_string(),
            })?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|header| {
                header
                    .iter()
                    .map(|cell| convert_cell(cell).as_text().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        Ok(SheetTable { headers, rows })
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) => CellValue::Float(*value),
        Data::Bool(value) => CellValue::Bool(*value),
        other => CellValue::Text(other.to_string()),
    }
}

/// Workbook held in memory, keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: HashMap<String, SheetTable>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, table: SheetTable) -> Self {
        self.sheets.insert(name.into(), table);
        self
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn sheet(&mut self, name: &str) -> Result<SheetTable> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| IngestError::SheetNotFound {
                sheet: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("  ".into()).is_blank());
        assert!(!CellValue::Int(0).is_blank());
        assert!(!CellValue::Text("BF".into()).is_blank());
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(CellValue::Float(20.0).as_i64(), Some(20));
        assert_eq!(CellValue::Text(" 40 ".into()).as_i64(), Some(40));
        assert_eq!(CellValue::Text("40.0".into()).as_i64(), Some(40));
        assert_eq!(CellValue::Text("forty".into()).as_i64(), None);
        assert_eq!(CellValue::Empty.as_f64(), None);
        assert_eq!(CellValue::Int(3).as_f64(), Some(3.0));
    }

    #[test]
    fn text_rendering() {
        assert_eq!(CellValue::Float(1.0).as_text().as_deref(), Some("1"));
        assert_eq!(CellValue::Float(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Text(" BF ".into()).as_text().as_deref(), Some("BF"));
        assert_eq!(CellValue::Empty.as_text(), None);
    }

    #[test]
    fn memory_workbook_missing_sheet() {
        let mut workbook = MemoryWorkbook::new();
        assert!(matches!(
            workbook.sheet("age_distribution"),
            Err(IngestError::SheetNotFound { .. })
        ));
    }

    #[test]
    fn short_rows_read_as_blank() {
        let table = SheetTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Int(1)]],
        );
        assert_eq!(table.cell(0, 1), &CellValue::Empty);
        assert_eq!(table.cell(9, 0), &CellValue::Empty);
    }
}
