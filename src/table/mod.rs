//! In-memory typed tables shared by every stage.
//!
//! A [`Table`] is a fixed [`Schema`] plus row-major values. Values carry total
//! equality and hashing so whole rows can be deduplicated, and numeric
//! comparisons treat integers and doubles alike.

pub mod csv_source;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{LakehouseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Double,
    Boolean,
    String,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Double)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "integer",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::String => "string",
        };
        f.write_str(name)
    }
}

/// A single cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; `None` for nulls and non-numeric cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a deserialized value to the column's declared type.
    ///
    /// JSON does not distinguish `3` from `3.0` once written by some encoders,
    /// so integers are widened into double columns here.
    pub fn coerce(self, data_type: DataType) -> Option<Value> {
        match (self, data_type) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Integer(i), DataType::Integer) => Some(Value::Integer(i)),
            (Value::Integer(i), DataType::Double) => Some(Value::Double(i as f64)),
            (Value::Double(d), DataType::Double) => Some(Value::Double(d)),
            (Value::Boolean(b), DataType::Boolean) => Some(Value::Boolean(b)),
            (Value::String(s), DataType::String) => Some(Value::String(s)),
            _ => None,
        }
    }

    fn double_bits(d: f64) -> u64 {
        if d == 0.0 {
            0.0f64.to_bits()
        } else if d.is_nan() {
            f64::NAN.to_bits()
        } else {
            d.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => Value::double_bits(*a) == Value::double_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Double(d) => Value::double_bits(*d).hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" on whole doubles
            Value::Double(d) => write!(f, "{:?}", d),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// What a stage requires of a column it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRequirement {
    Numeric,
    Any,
}

/// A column a stage declares it needs at its input boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedColumn {
    pub name: String,
    pub requirement: ColumnRequirement,
}

impl ExpectedColumn {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirement: ColumnRequirement::Numeric,
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirement: ColumnRequirement::Any,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Resolve an expected column, failing with `MissingColumn` or `ColumnType`.
    pub fn require(&self, expected: &ExpectedColumn) -> Result<usize> {
        let idx = self
            .index_of(&expected.name)
            .ok_or_else(|| LakehouseError::MissingColumn {
                column: expected.name.clone(),
                available: self.names().join(", "),
            })?;
        let data_type = self.columns[idx].data_type;
        if expected.requirement == ColumnRequirement::Numeric && !data_type.is_numeric() {
            return Err(LakehouseError::ColumnType {
                column: expected.name.clone(),
                expected: "numeric".to_string(),
                found: data_type.to_string(),
            });
        }
        Ok(idx)
    }

    /// Resolve a full expected-schema declaration, returning column indexes in order.
    pub fn require_all(&self, expected: &[ExpectedColumn]) -> Result<Vec<usize>> {
        expected.iter().map(|e| self.require(e)).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows, for samples.
    pub fn head(&self, n: usize) -> Table {
        Table::new(
            self.schema.clone(),
            self.rows.iter().take(n).cloned().collect(),
        )
    }

    pub fn filter<F>(self, mut keep: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        let Table { schema, rows } = self;
        let rows = rows.into_iter().filter(|r| keep(r)).collect();
        Table { schema, rows }
    }

    /// Drop rows equal to an earlier row across all columns; first occurrence wins.
    pub fn distinct(self) -> Table {
        let Table { schema, rows } = self;
        let mut seen: HashSet<Row> = HashSet::with_capacity(rows.len());
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if !seen.contains(&row) {
                seen.insert(row.clone());
                kept.push(row);
            }
        }
        Table { schema, rows: kept }
    }

    /// Append a derived column computed from each existing row.
    pub fn with_column<F>(self, column: Column, mut derive: F) -> Table
    where
        F: FnMut(&Row) -> Value,
    {
        let Table { mut schema, rows } = self;
        let rows = rows
            .into_iter()
            .map(|mut row| {
                let value = derive(&row);
                row.push(value);
                row
            })
            .collect();
        schema.columns.push(column);
        Table { schema, rows }
    }

    /// Resolve expected columns against this table.
    ///
    /// Same checks as [`Schema::require_all`], except that a column holding
    /// only nulls meets any type requirement: an empty or all-blank batch has
    /// no cells to infer a numeric type from.
    pub fn require_all(&self, expected: &[ExpectedColumn]) -> Result<Vec<usize>> {
        expected
            .iter()
            .map(|e| match self.schema.require(e) {
                Err(err @ LakehouseError::ColumnType { .. }) => match self.schema.index_of(&e.name) {
                    Some(idx) if self.rows.iter().all(|r| r[idx].is_null()) => Ok(idx),
                    _ => Err(err),
                },
                other => other,
            })
            .collect()
    }

    /// Non-null numeric values of a column
    pub fn numeric_values(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r[idx].as_f64()).collect()
    }

    /// Row multiset equality, ignoring order.
    pub fn same_rows_as(&self, other: &Table) -> bool {
        if self.schema != other.schema || self.len() != other.len() {
            return false;
        }
        let mut counts: std::collections::HashMap<&Row, i64> = std::collections::HashMap::new();
        for row in &self.rows {
            *counts.entry(row).or_insert(0) += 1;
        }
        for row in &other.rows {
            *counts.entry(row).or_insert(0) -= 1;
        }
        counts.values().all(|c| *c == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trips() -> Table {
        Table::new(
            Schema::new(vec![
                Column::new("fare_amount", DataType::Double),
                Column::new("vendor", DataType::String),
            ]),
            vec![
                vec![Value::Double(10.0), Value::from("a")],
                vec![Value::Double(12.0), Value::from("b")],
                vec![Value::Double(10.0), Value::from("a")],
            ],
        )
    }

    #[test]
    fn distinct_keeps_first_occurrence_and_is_idempotent() {
        let once = trips().distinct();
        assert_eq!(once.len(), 2);
        assert_eq!(once.rows[0], vec![Value::Double(10.0), Value::from("a")]);

        let twice = once.clone().distinct();
        assert_eq!(once, twice);
    }

    #[test]
    fn signed_zero_rows_are_duplicates() {
        let table = Table::new(
            Schema::new(vec![Column::new("x", DataType::Double)]),
            vec![vec![Value::Double(0.0)], vec![Value::Double(-0.0)]],
        );
        assert_eq!(table.distinct().len(), 1);
    }

    #[test]
    fn require_reports_missing_and_mistyped_columns() {
        let schema = trips().schema;
        assert_eq!(schema.require(&ExpectedColumn::numeric("fare_amount")).unwrap(), 0);

        match schema.require(&ExpectedColumn::numeric("trip_distance")) {
            Err(LakehouseError::MissingColumn { column, available }) => {
                assert_eq!(column, "trip_distance");
                assert_eq!(available, "fare_amount, vendor");
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(matches!(
            schema.require(&ExpectedColumn::numeric("vendor")),
            Err(LakehouseError::ColumnType { .. })
        ));
        assert!(schema.require(&ExpectedColumn::any("vendor")).is_ok());
    }

    #[test]
    fn all_null_column_meets_numeric_requirement() {
        let schema = Schema::new(vec![
            Column::new("fare_amount", DataType::String),
            Column::new("vendor", DataType::String),
        ]);
        let expected = [ExpectedColumn::numeric("fare_amount")];

        assert_eq!(Table::empty(schema.clone()).require_all(&expected).unwrap(), vec![0]);

        let blank = Table::new(schema.clone(), vec![vec![Value::Null, Value::from("a")]]);
        assert_eq!(blank.require_all(&expected).unwrap(), vec![0]);

        let text = Table::new(schema, vec![vec![Value::from("ten"), Value::from("a")]]);
        assert!(matches!(
            text.require_all(&expected),
            Err(LakehouseError::ColumnType { .. })
        ));
        assert!(matches!(
            text.require_all(&[ExpectedColumn::numeric("trip_distance")]),
            Err(LakehouseError::MissingColumn { .. })
        ));
    }

    #[test]
    fn with_column_appends_to_schema_and_rows() {
        let table = trips().with_column(Column::new("flag", DataType::Boolean), |row| {
            Value::Boolean(row[0].as_f64() == Some(12.0))
        });
        assert_eq!(table.schema.len(), 3);
        assert_eq!(table.rows[1][2], Value::Boolean(true));
    }

    #[test]
    fn coerce_widens_integers_into_double_columns() {
        assert_eq!(Value::Integer(3).coerce(DataType::Double), Some(Value::Double(3.0)));
        assert_eq!(Value::from("x").coerce(DataType::Integer), None);
        assert_eq!(Value::Null.coerce(DataType::String), Some(Value::Null));
    }

    #[test]
    fn same_rows_ignores_order() {
        let a = trips();
        let mut b = trips();
        b.rows.reverse();
        assert!(a.same_rows_as(&b));
        b.rows.pop();
        assert!(!a.same_rows_as(&b));
    }

    #[test]
    fn double_display_keeps_fraction() {
        assert_eq!(Value::Double(11.0).to_string(), "11.0");
        assert_eq!(Value::Integer(11).to_string(), "11");
    }
}
