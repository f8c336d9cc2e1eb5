use std::path::Path;

use anyhow::{Context, Result, bail};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::pipeline::ExportTable;
use crate::record::{Cell, MatchRecord};

const SHEET_NAME: &str = "Matches";
const MAX_SHEET_COLUMNS: usize = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => TableFormat::Xlsx,
            _ => TableFormat::Csv,
        }
    }
}

pub fn write_table(path: &Path, table: &ExportTable) -> Result<()> {
    match TableFormat::for_path(path) {
        TableFormat::Csv => write_csv(path, table),
        TableFormat::Xlsx => write_xlsx(path, table),
    }
}

pub fn write_csv(path: &Path, table: &ExportTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed creating {}", path.display()))?;
    writer
        .write_record(&table.columns)
        .context("write csv header")?;
    for (idx, record) in table.records.iter().enumerate() {
        writer
            .write_record(row_values(record, &table.columns).iter().map(|c| c.to_string()))
            .with_context(|| format!("write csv row {idx}"))?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}

pub fn write_xlsx(path: &Path, table: &ExportTable) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;
        write_rows(sheet, table)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn sheet_col(idx: usize) -> Result<u16> {
    if idx >= MAX_SHEET_COLUMNS {
        bail!("column {idx} exceeds the worksheet column limit of {MAX_SHEET_COLUMNS}");
    }
    u16::try_from(idx).with_context(|| format!("column {idx} exceeds the worksheet column limit"))
}

/// Values of `record` in `columns` order. Records are re-keyed before export, so a miss here
/// only happens for hand-built tables and reads as empty.
fn row_values<'r>(record: &'r MatchRecord, columns: &[String]) -> Vec<&'r Cell> {
    static EMPTY: Cell = Cell::Text(String::new());
    columns
        .iter()
        .map(|column| record.get(column).unwrap_or(&EMPTY))
        .collect()
}

fn write_rows(worksheet: &mut Worksheet, table: &ExportTable) -> Result<()> {
    for (col_idx, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, sheet_col(col_idx)?, name)
            .with_context(|| format!("write header {name}"))?;
    }
    for (idx, record) in table.records.iter().enumerate() {
        let row_idx = u32::try_from(idx + 1)
            .with_context(|| format!("row {idx} exceeds the worksheet row limit"))?;
        for (col_idx, value) in row_values(record, &table.columns).into_iter().enumerate() {
            let col_idx = sheet_col(col_idx)?;
            match value {
                Cell::Int(v) => worksheet.write_number(row_idx, col_idx, *v as f64),
                Cell::Float(v) => worksheet.write_number(row_idx, col_idx, *v),
                Cell::Text(s) => worksheet.write_string(row_idx, col_idx, s),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
