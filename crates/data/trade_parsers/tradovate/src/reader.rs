use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use models::{CellValue, RawRow};
use std::io::Cursor;
use std::path::Path;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    /// Anything calamine can open: xlsx, xlsm, xlsb, xls, ods.
    Workbook,
}

impl FileFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let is_csv = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            FileFormat::Csv
        } else {
            FileFormat::Workbook
        }
    }
}

/// Reads the rows of an export file, blocking.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| invalid_file(path, e))?;
    parse_rows(bytes, FileFormat::from_path(path))
}

/// Reads the rows of an export file. The file read is the only await point;
/// parsing happens synchronously once the bytes are in.
pub async fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| invalid_file(path, e))?;
    parse_rows(bytes, FileFormat::from_path(path))
}

fn invalid_file(path: &Path, e: impl std::fmt::Display) -> IngestError {
    IngestError::InvalidFile(format!("{}: {}", path.display(), e))
}

pub fn parse_rows(bytes: Vec<u8>, format: FileFormat) -> Result<Vec<RawRow>> {
    match format {
        FileFormat::Csv => parse_csv(&bytes),
        FileFormat::Workbook => parse_workbook(bytes),
    }
}

/// First sheet only, first row is the header row.
fn parse_workbook(bytes: Vec<u8>) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IngestError::InvalidFile(e.to_string()))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::InvalidFile("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| IngestError::InvalidFile(format!("sheet '{}': {}", first_sheet, e)))?;

    let rows = rows_from_range(&range);
    tracing::debug!(sheet = %first_sheet, rows = rows.len(), "Read workbook");
    Ok(rows)
}

pub fn rows_from_range(range: &Range<Data>) -> Vec<RawRow> {
    let mut lines = range.rows();
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header
        .iter()
        .map(|c| header_name(&data_to_cell(c).to_text()))
        .collect();

    lines
        .filter_map(|line| {
            let row: RawRow = line
                .iter()
                .enumerate()
                .filter_map(|(idx, cell)| {
                    let name = headers.get(idx).filter(|h| !h.is_empty())?;
                    let value = data_to_cell(cell);
                    (value != CellValue::Empty).then(|| (name.clone(), value))
                })
                .collect();
            (!row.is_empty()).then_some(row)
        })
        .collect()
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::InvalidFile(e.to_string()))?
        .iter()
        .map(header_name)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::InvalidFile(e.to_string()))?;
        let row: RawRow = record
            .iter()
            .enumerate()
            .filter_map(|(idx, field)| {
                let name = headers.get(idx).filter(|h| !h.is_empty())?;
                let value = csv_cell(field);
                (value != CellValue::Empty).then(|| (name.clone(), value))
            })
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }

    tracing::debug!(rows = rows.len(), "Read CSV");
    Ok(rows)
}

fn header_name(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// CSV fields are text; numeric-looking ones become numbers like a spreadsheet would.
fn csv_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(field.to_string()),
    }
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial)
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Number(serial))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// Excel serial date-time using the 1899-12-30 base, rounded to the second.
pub fn excel_serial_to_datetime(v: f64) -> Option<NaiveDateTime> {
    if !v.is_finite() {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (v * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::seconds(seconds))
}
