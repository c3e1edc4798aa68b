use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use super::{Column, DataType, Row, Schema, Table, Value};
use crate::error::{LakehouseError, Result};

/// Read a delimited file with a header row, inferring a type for every column.
///
/// Cells are trimmed; empty cells become nulls. Short rows are padded with
/// nulls and extra trailing cells are dropped.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let source = path.display().to_string();
    if !path.is_file() {
        return Err(LakehouseError::SourceNotFound { path: source });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let header: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    validate_header(&header).map_err(|reason| LakehouseError::SchemaInference {
        path: source.clone(),
        reason,
    })?;

    let width = header.len();
    let mut cells: Vec<Vec<String>> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != width {
            warn!(
                "{}: row {} has {} fields, expected {}",
                source,
                line + 1,
                record.len(),
                width
            );
        }
        let mut row: Vec<String> = record.iter().take(width).map(|c| c.to_string()).collect();
        row.resize(width, String::new());
        cells.push(row);
    }

    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let data_type = infer_type(cells.iter().map(|row| row[idx].as_str()));
            Column::new(name.clone(), data_type)
        })
        .collect();
    debug!(
        "Inferred schema for {}: {}",
        source,
        columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let rows: Vec<Row> = cells
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(columns.iter())
                .map(|(cell, column)| parse_cell(cell, column.data_type))
                .collect()
        })
        .collect();

    Ok(Table::new(Schema::new(columns), rows))
}

fn validate_header(header: &[String]) -> std::result::Result<(), String> {
    if header.is_empty() || header.iter().all(|h| h.is_empty()) {
        return Err("header row is missing or empty".to_string());
    }
    let mut seen = HashSet::new();
    for (idx, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(format!("column {} has an empty name", idx + 1));
        }
        if !seen.insert(name.as_str()) {
            return Err(format!("duplicate column name '{}'", name));
        }
    }
    Ok(())
}

/// Narrowest type that every non-empty cell parses as.
pub fn infer_type<'a, I>(cells: I) -> DataType
where
    I: Iterator<Item = &'a str>,
{
    let mut integer = true;
    let mut double = true;
    let mut boolean = true;
    let mut any = false;

    for cell in cells.filter(|c| !c.is_empty()) {
        any = true;
        integer = integer && cell.parse::<i64>().is_ok();
        double = double && cell.parse::<f64>().map(|d| d.is_finite()).unwrap_or(false);
        boolean = boolean && parse_bool(cell).is_some();
        if !integer && !double && !boolean {
            return DataType::String;
        }
    }

    if !any {
        DataType::String
    } else if integer {
        DataType::Integer
    } else if double {
        DataType::Double
    } else if boolean {
        DataType::Boolean
    } else {
        DataType::String
    }
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_cell(cell: &str, data_type: DataType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    // Inference already proved every non-empty cell parses
    match data_type {
        DataType::Integer => cell.parse().map(Value::Integer).unwrap_or(Value::Null),
        DataType::Double => cell.parse().map(Value::Double).unwrap_or(Value::Null),
        DataType::Boolean => parse_bool(cell).map(Value::Boolean).unwrap_or(Value::Null),
        DataType::String => Value::String(cell.to_string()),
    }
}
