use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use w2w_pipeline::{ConvertOutcome, InventoryYear, MergeOutcome, PrepareOutcome, RollbackOutcome};

use w2w_cli::commands::{AgeDistributionReport, RunReport};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

/// Two-column table of labelled values.
fn key_value_table(rows: Vec<(&str, String)>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Value")]);
    apply_table_style(&mut table);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    table
}

pub fn print_prepare(outcome: &PrepareOutcome) {
    let year = |year: Option<i32>| year.map_or_else(|| "template".to_string(), |y| y.to_string());
    let mut rows = vec![
        ("Project", outcome.project_root.display().to_string()),
        ("Tiled layers", outcome.tiled_layers.display().to_string()),
        ("Input database", outcome.input_db.display().to_string()),
    ];
    if let Some(rollback) = &outcome.rollback {
        rows.push(("Rollback layers", rollback.output_path.display().to_string()));
        rows.push(("Rollback database", rollback.db_path.display().to_string()));
    }
    rows.push(("GCBM project", outcome.gcbm_project.display().to_string()));
    rows.push(("Start year", year(outcome.start_year)));
    rows.push(("End year", year(outcome.end_year)));
    println!("{}", key_value_table(rows));
}

pub fn print_age_distribution(report: &AgeDistributionReport) {
    println!("Workbook: {}", report.workbook.display());
    println!("Output: {}", report.output.display());
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Disturbance types"),
        header_cell("Classifiers"),
        header_cell("Ages"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for (index, record) in report.records.iter().enumerate() {
        let disturbance_cell = if record.disturbance_types.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(record.disturbance_types.join(", "))
        };
        let classifier_cell = if record.classifiers.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(&record.classifiers)
        };
        table.add_row(vec![
            Cell::new(index + 1),
            disturbance_cell,
            classifier_cell,
            Cell::new(record.distribution.len()),
        ]);
    }
    println!("{table}");
}

pub fn print_convert(outcome: &ConvertOutcome) {
    let defaults = if outcome.copied_defaults {
        "copied"
    } else {
        "built"
    };
    let spatial = outcome
        .spatial_inventory
        .as_ref()
        .map_or_else(|| "skipped".to_string(), |path| path.display().to_string());
    let table = key_value_table(vec![
        ("Source database", outcome.source_db.display().to_string()),
        ("Yields", outcome.tables.yields_path.display().to_string()),
        ("Yield rows", outcome.tables.yield_rows.to_string()),
        ("Transitions", outcome.tables.transitions_path.display().to_string()),
        ("Transition rows", outcome.tables.transition_rows.to_string()),
        ("AIDB", outcome.aidb_path.display().to_string()),
        (
            "CBM defaults",
            format!("{} ({defaults})", outcome.cbm_defaults_path.display()),
        ),
        ("Spatial inventory", spatial),
    ]);
    println!("{table}");
}

pub fn print_rollback(outcome: &RollbackOutcome) {
    let inventory_year = match &outcome.inventory_year {
        InventoryYear::Year(year) => year.to_string(),
        InventoryYear::Layer(layer) => layer.clone(),
    };
    let mut age_distribution = outcome.age_distribution.display().to_string();
    if outcome.converted_age_distribution {
        age_distribution.push_str(" (converted)");
    }
    let table = key_value_table(vec![
        ("Rollback layers", outcome.output_path.display().to_string()),
        ("Rollback database", outcome.db_path.display().to_string()),
        ("Inventory year", inventory_year),
        ("Age distribution", age_distribution),
    ]);
    println!("{table}");
}

pub fn print_merge(outcome: &MergeOutcome) {
    let table = key_value_table(vec![
        ("Projects", outcome.project_count.to_string()),
        (
            "Simulation years",
            format!("{}-{}", outcome.window.start_year, outcome.window.end_year),
        ),
        ("Memory ceiling", format!("{} MB", outcome.memory_limit_mb)),
        ("Input database", outcome.db_path.display().to_string()),
        ("Tiled layers", outcome.tiled_layers.display().to_string()),
        ("GCBM project", outcome.gcbm_project.display().to_string()),
        ("Manifest", outcome.manifest_path.display().to_string()),
    ]);
    println!("{table}");
}

pub fn print_run(report: &RunReport) {
    let table = key_value_table(vec![
        ("Host", report.host.to_string()),
        ("Project", report.project.display().to_string()),
        ("Command", report.command_line.clone()),
    ]);
    println!("{table}");
}
