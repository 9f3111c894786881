//! Tabular source loading.
//!
//! Responsibilities:
//! - Read CSV files (header row required) and the first sheet of spreadsheets
//! - Repair blank and repeated headers so every column has a unique name
//! - Infer one storage type per column from the values present
//!
//! A source either loads completely or fails: there is no partial-row recovery.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Days, NaiveDate};

use crate::coerce::{parse_date, parse_number, settle_numeric};
use crate::error::{EtlError, Result};
use crate::table::{SemanticType, Table, Value};

/// Extensions routed to the spreadsheet reader.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Cell texts read as missing. Matched exactly, without trimming.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load a source file into a table called `name`.
pub async fn read_table(path: &Path, name: &str) -> Result<Table> {
    if is_spreadsheet(path) {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| source_error(path, e))?;
        return read_spreadsheet(path, name);
    }

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| source_error(path, e))?;
    let table = parse_csv(&content, path, name)?;
    tracing::debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.fields().len(),
        "loaded csv source"
    );
    Ok(table)
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn source_error(path: &Path, err: std::io::Error) -> EtlError {
    if err.kind() == std::io::ErrorKind::NotFound {
        EtlError::SourceNotFound {
            path: path.to_path_buf(),
        }
    } else {
        EtlError::SourceRead {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Parse CSV bytes. `path` is only used for error messages.
pub fn parse_csv(content: &[u8], path: &Path, name: &str) -> Result<Table> {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EtlError::malformed(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        return Err(EtlError::malformed(path, "no header row"));
    }
    let headers = repair_headers(headers);

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (line_idx, result) in reader.records().enumerate() {
        let line_num = line_idx + 2; // +1 for 0-index, +1 for header
        let record = result.map_err(|e| EtlError::malformed(path, e))?;

        if record.len() > headers.len() {
            return Err(EtlError::malformed(
                path,
                format!(
                    "line {}: expected {} fields, found {}",
                    line_num,
                    headers.len(),
                    record.len()
                ),
            ));
        }

        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(record.get(idx).map_or(Value::Null, text_cell));
        }
    }

    Ok(assemble(name, headers, columns.into_iter().map(infer_text_column)))
}

fn text_cell(raw: &str) -> Value {
    if raw.is_empty() || NA_TOKENS.contains(&raw) {
        Value::Null
    } else {
        Value::Text(raw.to_string())
    }
}

/// Numeric if every present value parses as a number, text otherwise.
fn infer_text_column(values: Vec<Value>) -> (SemanticType, Vec<Value>) {
    let numeric = values.iter().all(|v| match v {
        Value::Text(raw) => parse_number(raw).is_some(),
        _ => true,
    });
    if !numeric {
        return (SemanticType::Text, values);
    }
    let numbers = values
        .into_iter()
        .map(|v| match v {
            Value::Text(raw) => parse_number(&raw).unwrap_or(Value::Null),
            other => other,
        })
        .collect();
    settle_numeric(numbers)
}

// =============================================================================
// SPREADSHEETS
// =============================================================================

fn read_spreadsheet(path: &Path, name: &str) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| match e {
        calamine::Error::Io(io) => source_error(path, io),
        other => EtlError::malformed(path, other),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EtlError::malformed(path, "workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| EtlError::malformed(path, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| EtlError::malformed(path, format!("sheet '{}' has no header row", sheet_name)))?
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    let headers = repair_headers(headers);

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get(idx).map_or(Value::Null, cell_value));
        }
    }

    tracing::debug!(
        path = %path.display(),
        sheet = %sheet_name,
        rows = columns.first().map_or(0, Vec::len),
        "loaded spreadsheet source"
    );

    Ok(assemble(name, headers, columns.into_iter().map(infer_cell_column)))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) if f.is_finite() => Value::Real(*f),
        Data::String(s) => text_cell(s),
        Data::Bool(b) => Value::Integer(i64::from(*b)),
        Data::DateTime(dt) => excel_serial_date(dt.as_f64()).map_or(Value::Null, Value::Date),
        Data::DateTimeIso(s) => parse_date(s).map_or(Value::Null, Value::Date),
        Data::DurationIso(s) => Value::Text(s.clone()),
        _ => Value::Null,
    }
}

/// Day serial in the 1900 date system. Serial 1 is 1900-01-01; serial 60 is
/// Excel's nonexistent 1900-02-29 and has no calendar date.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let epoch = match days {
        0..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_days(Days::new(days))
}

/// Spreadsheet cells are already typed; unify each column on one type.
fn infer_cell_column(values: Vec<Value>) -> (SemanticType, Vec<Value>) {
    if values
        .iter()
        .all(|v| matches!(v, Value::Null | Value::Integer(_) | Value::Real(_)))
    {
        return settle_numeric(values);
    }
    if values.iter().all(|v| matches!(v, Value::Null | Value::Date(_))) {
        return (SemanticType::Date, values);
    }
    let text = values
        .into_iter()
        .map(|v| match v {
            Value::Integer(i) => Value::Text(i.to_string()),
            Value::Real(f) => Value::Text(f.to_string()),
            Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
            other => other,
        })
        .collect();
    (SemanticType::Text, text)
}

// =============================================================================
// SHARED
// =============================================================================

/// Blank headers become `Unnamed: <index>`; repeats get `.1`, `.2`, ... suffixes.
fn repair_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut repaired = Vec::with_capacity(headers.len());

    for (idx, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        repaired.push(candidate);
    }

    repaired
}

fn assemble(
    name: &str,
    headers: Vec<String>,
    columns: impl Iterator<Item = (SemanticType, Vec<Value>)>,
) -> Table {
    let mut types = Vec::with_capacity(headers.len());
    let mut settled: Vec<Vec<Value>> = Vec::with_capacity(headers.len());
    for (ty, values) in columns {
        types.push(ty);
        settled.push(values);
    }

    let height = settled.first().map_or(0, Vec::len);
    let mut rows: Vec<Vec<Value>> = (0..height)
        .map(|_| Vec::with_capacity(settled.len()))
        .collect();
    for column in settled {
        for (row, value) in rows.iter_mut().zip(column) {
            row.push(value);
        }
    }

    Table::from_rows(name, headers.into_iter().zip(types).collect(), rows)
}
