use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::percentile;
use crate::config::{CleaningConfig, ColumnsConfig};
use crate::constants::{TRIP_LONG, TRIP_MEDIUM, TRIP_SHORT, TRIP_TYPE_COLUMN};
use crate::error::{LakehouseError, Result};
use crate::table::{Column, DataType, ExpectedColumn, Table, Value};

/// Distance class derived for every cleaned trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    Short,
    Medium,
    Long,
}

impl TripType {
    /// Ordered threshold rule: `< short_below` is short, `< medium_below` medium, else long.
    pub fn classify(distance: f64, rules: &CleaningConfig) -> Self {
        if distance < rules.short_below {
            TripType::Short
        } else if distance < rules.medium_below {
            TripType::Medium
        } else {
            TripType::Long
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Short => TRIP_SHORT,
            TripType::Medium => TRIP_MEDIUM,
            TripType::Long => TRIP_LONG,
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counts and bounds observed during one cleaning run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub after_validity: usize,
    pub after_dedup: usize,
    pub p_lower: f64,
    pub p_upper: f64,
    pub after_outliers: usize,
}

#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub table: Table,
    pub stats: CleaningStats,
}

/// Columns the cleaning transform reads from the raw snapshot
pub fn expected_columns(columns: &ColumnsConfig) -> Vec<ExpectedColumn> {
    vec![
        ExpectedColumn::numeric(columns.fare.as_str()),
        ExpectedColumn::numeric(columns.distance.as_str()),
    ]
}

/// Keep rows whose fare and distance are both strictly positive. Nulls fail.
pub fn validity_filter(table: Table, fare_idx: usize, distance_idx: usize) -> Table {
    table.filter(|row| {
        let positive = |idx: usize| row[idx].as_f64().map(|v| v > 0.0).unwrap_or(false);
        positive(fare_idx) && positive(distance_idx)
    })
}

/// Collapse rows that are equal across every column.
pub fn deduplicate(table: Table) -> Table {
    table.distinct()
}

/// Lower and upper fare percentiles over the current population.
pub fn outlier_bounds(
    table: &Table,
    fare_idx: usize,
    fare_column: &str,
    rules: &CleaningConfig,
) -> Result<(f64, f64)> {
    percentile::bounds(
        table.numeric_values(fare_idx),
        rules.lower_percentile,
        rules.upper_percentile,
    )
    .ok_or_else(|| LakehouseError::EmptyPercentileInput {
        column: fare_column.to_string(),
    })
}

/// Keep rows with `lower <= fare <= upper`.
pub fn outlier_filter(table: Table, fare_idx: usize, lower: f64, upper: f64) -> Table {
    table.filter(|row| {
        row[fare_idx]
            .as_f64()
            .map(|fare| lower <= fare && fare <= upper)
            .unwrap_or(false)
    })
}

/// Append the `trip_type` column.
pub fn classify_trips(table: Table, distance_idx: usize, rules: &CleaningConfig) -> Table {
    table.with_column(Column::new(TRIP_TYPE_COLUMN, DataType::String), |row| {
        match row[distance_idx].as_f64() {
            Some(distance) => Value::from(TripType::classify(distance, rules).as_str()),
            None => Value::Null,
        }
    })
}

/// Raw trips to cleaned, classified trips.
///
/// Order matters: validity, dedup, bounds over the deduplicated population,
/// outlier filter, then classification.
pub fn clean(raw: Table, columns: &ColumnsConfig, rules: &CleaningConfig) -> Result<CleanOutput> {
    let idx = raw.require_all(&expected_columns(columns))?;
    let (fare_idx, distance_idx) = (idx[0], idx[1]);
    let input_rows = raw.len();

    let valid = validity_filter(raw, fare_idx, distance_idx);
    let after_validity = valid.len();
    debug!("validity filter kept {} of {} rows", after_validity, input_rows);

    let unique = deduplicate(valid);
    let after_dedup = unique.len();
    debug!("deduplication kept {} of {} rows", after_dedup, after_validity);

    let (p_lower, p_upper) = outlier_bounds(&unique, fare_idx, &columns.fare, rules)?;
    debug!("{} bounds: [{}, {}]", columns.fare, p_lower, p_upper);

    let inliers = outlier_filter(unique, fare_idx, p_lower, p_upper);
    let after_outliers = inliers.len();

    let table = classify_trips(inliers, distance_idx, rules);

    Ok(CleanOutput {
        table,
        stats: CleaningStats {
            input_rows,
            after_validity,
            after_dedup,
            p_lower,
            p_upper,
            after_outliers,
        },
    })
}
