//! Conversion of age-distribution workbooks into rollback JSON.
//!
//! The workbook has a root sheet named `age_distribution`. Each column header
//! of the root sheet names a distribution sheet, and the non-blank cells below
//! it list the disturbance types that distribution applies to. Every
//! distribution sheet has `min_age` and `proportion` columns plus optional
//! classifier columns. Rows sharing the same non-blank classifier values form
//! one distribution.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info, warn};

use w2w_model::{Classifier, ClassifierSet, DistributionRecord};

use crate::error::{IngestError, Result};
use crate::workbook::{CellValue, ExcelWorkbook, SheetTable, WorkbookSource};

/// Name of the sheet listing the distribution sheets.
pub const ROOT_SHEET: &str = "age_distribution";
pub const MIN_AGE_COLUMN: &str = "min_age";
pub const PROPORTION_COLUMN: &str = "proportion";

/// Builds [`DistributionRecord`]s from an age-distribution workbook.
#[derive(Debug, Clone, Default)]
pub struct AgeDistributionBuilder {
    classifiers: Vec<Classifier>,
}

impl AgeDistributionBuilder {
    pub fn new<I, C>(classifiers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Classifier>,
    {
        Self {
            classifiers: classifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the workbook at `path`.
    pub fn build_from_path(&self, path: &Path) -> Result<Vec<DistributionRecord>> {
        let mut workbook = ExcelWorkbook::open(path)?;
        self.build(&mut workbook)
    }

    /// Builds every distribution listed in the root sheet, in root column order.
    ///
    /// Nothing is returned unless every sheet converts.
    pub fn build<W: WorkbookSource>(&self, workbook: &mut W) -> Result<Vec<DistributionRecord>> {
        let root = workbook.sheet(ROOT_SHEET)?;
        let mut records = Vec::new();
        for (column, sheet_name) in root.headers.iter().enumerate() {
            let sheet_name = sheet_name.trim();
            if sheet_name.is_empty() {
                warn!(column, "skipping unnamed column in {ROOT_SHEET} sheet");
                continue;
            }
            let disturbance_types: Vec<String> = (0..root.rows.len())
                .filter_map(|row| root.cell(row, column).as_text())
                .collect();
            let sheet = workbook.sheet(sheet_name)?;
            let sheet_records = self.build_sheet(sheet_name, &disturbance_types, &sheet)?;
            debug!(
                sheet = %sheet_name,
                distributions = sheet_records.len(),
                disturbance_types = disturbance_types.len(),
                "converted age distribution sheet"
            );
            records.extend(sheet_records);
        }
        info!(distributions = records.len(), "built age distributions");
        Ok(records)
    }

    /// Groups one sheet's rows by classifier set.
    ///
    /// Groups are returned in first-seen order. Within a group a repeated
    /// `min_age` keeps the last proportion.
    pub fn build_sheet(
        &self,
        sheet_name: &str,
        disturbance_types: &[String],
        table: &SheetTable,
    ) -> Result<Vec<DistributionRecord>> {
        let min_age_col = required_column(table, sheet_name, MIN_AGE_COLUMN)?;
        let proportion_col = required_column(table, sheet_name, PROPORTION_COLUMN)?;
        let classifier_cols: Vec<(&str, usize)> = self
            .classifiers
            .iter()
            .filter_map(|classifier| {
                table
                    .column_index(&classifier.name)
                    .map(|col| (classifier.name.as_str(), col))
            })
            .collect();

        let mut groups: Vec<(ClassifierSet, BTreeMap<i64, f64>)> = Vec::new();
        let mut positions: HashMap<ClassifierSet, usize> = HashMap::new();

        for row in 0..table.rows.len() {
            if table.rows[row].iter().all(|cell| cell.is_blank()) {
                continue;
            }
            // Spreadsheet row number: header is row 1.
            let row_number = row + 2;
            let min_age_cell = table.cell(row, min_age_col);
            let age = min_age_cell
                .as_i64()
                .ok_or_else(|| invalid(sheet_name, row_number, MIN_AGE_COLUMN, min_age_cell))?;
            let proportion_cell = table.cell(row, proportion_col);
            let proportion = proportion_cell.as_f64().ok_or_else(|| {
                invalid(sheet_name, row_number, PROPORTION_COLUMN, proportion_cell)
            })?;

            let key: ClassifierSet = classifier_cols
                .iter()
                .filter_map(|&(name, col)| table.cell(row, col).as_text().map(|value| (name, value)))
                .collect();

            let position = match positions.get(&key) {
                Some(&position) => position,
                None => {
                    let position = groups.len();
                    groups.push((key.clone(), BTreeMap::new()));
                    positions.insert(key, position);
                    position
                }
            };
            groups[position].1.insert(age, proportion);
        }

        Ok(groups
            .into_iter()
            .map(|(classifiers, proportions)| DistributionRecord {
                disturbance_types: disturbance_types.to_vec(),
                classifiers,
                distribution: proportions.into_iter().collect(),
            })
            .collect())
    }
}

fn required_column(table: &SheetTable, sheet: &str, column: &str) -> Result<usize> {
    table
        .column_index(column)
        .ok_or_else(|| IngestError::MissingColumn {
            column: column.to_string(),
            sheet: sheet.to_string(),
        })
}

fn invalid(sheet: &str, row: usize, column: &str, cell: &CellValue) -> IngestError {
    IngestError::InvalidValue {
        sheet: sheet.to_string(),
        row,
        column: column.to_string(),
        value: cell.as_text().unwrap_or_default(),
    }
}

/// Writes distributions as indented JSON.
///
/// The document is written to a sibling temporary file first and renamed into
/// place, so a failed write never leaves a truncated file at `path`.
pub fn write_distribution_json(records: &[DistributionRecord], path: &Path) -> Result<()> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;

    let write_err = |source| IngestError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(&buffer).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;
    info!(path = %path.display(), distributions = records.len(), "wrote age distributions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> CellValue {
        CellValue::Int(value)
    }

    fn num(value: f64) -> CellValue {
        CellValue::Float(value)
    }

    fn sheet(headers: &[&str], rows: Vec<Vec<CellValue>>) -> SheetTable {
        SheetTable::new(headers.iter().map(|h| (*h).to_string()).collect(), rows)
    }

    #[test]
    fn groups_rows_by_classifier_values() {
        let builder = AgeDistributionBuilder::new(["LdSpp", "Region"]);
        let table = sheet(
            &["LdSpp", "min_age", "proportion"],
            vec![
                vec!["BF".into(), int(0), num(0.5)],
                vec!["SW".into(), int(0), num(1.0)],
                vec!["BF".into(), int(20), num(0.5)],
            ],
        );
        let records = builder.build_sheet("fire", &[], &table).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].classifiers, ClassifierSet::new([("LdSpp", "BF")]));
        assert_eq!(records[0].distribution, vec![(0, 0.5), (20, 0.5)]);
        assert_eq!(records[1].classifiers, ClassifierSet::new([("LdSpp", "SW")]));
    }

    #[test]
    fn blank_classifier_cells_are_excluded_from_key() {
        let builder = AgeDistributionBuilder::new(["LdSpp"]);
        let table = sheet(
            &["LdSpp", "min_age", "proportion"],
            vec![
                vec![CellValue::Empty, int(0), num(0.3)],
                vec!["  ".into(), int(10), num(0.7)],
            ],
        );
        let records = builder.build_sheet("fire", &[], &table).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].classifiers.is_empty());
        assert_eq!(records[0].distribution, vec![(0, 0.3), (10, 0.7)]);
    }

    #[test]
    fn unconfigured_columns_are_ignored() {
        let builder = AgeDistributionBuilder::new(["LdSpp", "NotInSheet"]);
        let table = sheet(
            &["Notes", "LdSpp", "min_age", "proportion"],
            vec![vec!["a".into(), "BF".into(), int(0), num(1.0)]],
        );
        let records = builder.build_sheet("fire", &[], &table).unwrap();
        assert_eq!(records[0].classifiers, ClassifierSet::new([("LdSpp", "BF")]));
    }

    #[test]
    fn duplicate_age_keeps_last_proportion() {
        let builder = AgeDistributionBuilder::new(Vec::<Classifier>::new());
        let table = sheet(
            &["min_age", "proportion"],
            vec![
                vec![int(40), num(0.1)],
                vec![int(0), num(0.2)],
                vec![int(40), num(0.8)],
            ],
        );
        let records = builder.build_sheet("fire", &[], &table).unwrap();
        assert_eq!(records[0].distribution, vec![(0, 0.2), (40, 0.8)]);
    }

    #[test]
    fn missing_required_columns_fail() {
        let builder = AgeDistributionBuilder::default();
        let no_age = sheet(&["proportion"], vec![vec![num(1.0)]]);
        assert!(matches!(
            builder.build_sheet("fire", &[], &no_age),
            Err(IngestError::MissingColumn { ref column, .. }) if column == "min_age"
        ));
        let no_proportion = sheet(&["min_age"], vec![vec![int(0)]]);
        assert!(matches!(
            builder.build_sheet("fire", &[], &no_proportion),
            Err(IngestError::MissingColumn { ref column, .. }) if column == "proportion"
        ));
    }

    #[test]
    fn non_numeric_age_fails_with_row_number() {
        let builder = AgeDistributionBuilder::default();
        let table = sheet(
            &["min_age", "proportion"],
            vec![vec![int(0), num(0.5)], vec!["old".into(), num(0.5)]],
        );
        let error = builder.build_sheet("fire", &[], &table).unwrap_err();
        assert!(matches!(error, IngestError::InvalidValue { row: 3, .. }));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let builder = AgeDistributionBuilder::default();
        let table = sheet(
            &["min_age", "proportion"],
            vec![
                vec![int(0), num(1.0)],
                vec![CellValue::Empty, CellValue::Empty],
            ],
        );
        let records = builder.build_sheet("fire", &[], &table).unwrap();
        assert_eq!(records[0].distribution, vec![(0, 1.0)]);
    }
}
