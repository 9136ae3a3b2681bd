//! Ingestion parser: uploaded bytes to ordered tabular rows.
//!
//! Only the first sheet of a workbook is read. Blank cells are kept as
//! empty strings so every row carries the full header column set.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// One parsed row: column name -> scalar, in sheet column order.
pub type Row = IndexMap<String, Value>;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no file content supplied")]
    EmptyInput,

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("sheet contains no data rows")]
    EmptySheet,

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Decode uploaded bytes into rows, dispatching on the declared filename.
pub fn parse(bytes: &[u8], filename: &str) -> Result<Vec<Row>, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    match extension(filename).as_deref() {
        Some("csv") => parse_csv(bytes),
        Some("xlsx") | Some("xls") | Some("xlsm") | Some("xlsb") | Some("ods") => {
            parse_workbook(bytes)
        }
        Some(other) => Err(ParseError::UnsupportedFormat(format!(".{other}"))),
        None => Err(ParseError::UnsupportedFormat(filename.to_string())),
    }
}

fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<Row>, ParseError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| ParseError::UnsupportedFormat(err.to_string()))?
        .iter()
        .enumerate()
        .map(|(idx, name)| column_name(name, idx))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| ParseError::UnsupportedFormat(err.to_string()))?;
        let mut row = Row::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let cell = record.get(idx).unwrap_or("");
            row.insert(header.clone(), coerce_text(cell));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParseError::EmptySheet);
    }
    Ok(rows)
}

fn parse_workbook(bytes: &[u8]) -> Result<Vec<Row>, ParseError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|err| ParseError::UnsupportedFormat(err.to_string()))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let first_sheet = sheet_names.first().ok_or(ParseError::NoSheets)?;

    let range = workbook
        .worksheet_range(first_sheet)
        .map_err(|err| ParseError::UnsupportedFormat(err.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(idx, cell)| column_name(cell.to_string().trim(), idx))
            .collect(),
        None => return Err(ParseError::EmptySheet),
    };

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        let mut row = Row::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let value = sheet_row.get(idx).map(coerce_cell).unwrap_or_else(empty);
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParseError::EmptySheet);
    }
    Ok(rows)
}

fn column_name(name: &str, idx: usize) -> String {
    if name.trim().is_empty() {
        format!("Column{}", idx + 1)
    } else {
        name.trim().to_string()
    }
}

fn empty() -> Value {
    Value::String(String::new())
}

fn coerce_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => empty(),
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => number(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => empty(),
    }
}

/// Mirror typed spreadsheet cells for CSV input: integers, floats and
/// booleans decode as such, everything else stays a string.
fn coerce_text(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return empty();
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return number(f);
    }
    match trimmed {
        "true" | "TRUE" | "True" => Value::Bool(true),
        "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

fn number(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(empty)
}
