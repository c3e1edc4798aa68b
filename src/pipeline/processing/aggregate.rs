use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::ColumnsConfig;
use crate::constants::AVG_FARE_COLUMN;
use crate::error::Result;
use crate::table::{Column, DataType, ExpectedColumn, Schema, Table, Value};

/// Columns the aggregation reads from the clean snapshot
pub fn expected_columns(columns: &ColumnsConfig) -> Vec<ExpectedColumn> {
    vec![
        ExpectedColumn::any(columns.pickup.as_str()),
        ExpectedColumn::any(columns.dropoff.as_str()),
        ExpectedColumn::numeric(columns.fare.as_str()),
    ]
}

struct RouteAccumulator {
    key: (Value, Value),
    sum: f64,
    count: usize,
}

/// Mean fare per (pickup, dropoff) pair, one output row per distinct pair.
///
/// Groups appear in first-seen order. Null key components group together; a
/// group with no non-null fares averages to null. No minimum group size.
pub fn average_fare_by_route(clean: &Table, columns: &ColumnsConfig) -> Result<Table> {
    let idx = clean.require_all(&expected_columns(columns))?;
    let (pickup_idx, dropoff_idx, fare_idx) = (idx[0], idx[1], idx[2]);

    let mut positions: HashMap<(Value, Value), usize> = HashMap::new();
    let mut groups: Vec<RouteAccumulator> = Vec::new();

    for row in &clean.rows {
        let key = (row[pickup_idx].clone(), row[dropoff_idx].clone());
        let pos = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push(RouteAccumulator {
                key,
                sum: 0.0,
                count: 0,
            });
            groups.len() - 1
        });
        if let Some(fare) = row[fare_idx].as_f64() {
            groups[pos].sum += fare;
            groups[pos].count += 1;
        }
    }

    let schema = Schema::new(vec![
        clean.schema.columns[pickup_idx].clone(),
        clean.schema.columns[dropoff_idx].clone(),
        Column::new(AVG_FARE_COLUMN, DataType::Double),
    ]);
    let rows = groups
        .into_iter()
        .map(|g| {
            let avg = if g.count == 0 {
                Value::Null
            } else {
                Value::Double(g.sum / g.count as f64)
            };
            vec![g.key.0, g.key.1, avg]
        })
        .collect();

    Ok(Table::new(schema, rows))
}

/// Display-only view: the `n` routes with the highest average fare.
///
/// Stable sort, descending; null averages sort last.
pub fn top_routes(summary: &Table, n: usize) -> Result<Table> {
    let avg_idx = summary
        .schema
        .require(&ExpectedColumn::numeric(AVG_FARE_COLUMN))?;

    let mut rows = summary.rows.clone();
    rows.sort_by(|a, b| descending(a[avg_idx].as_f64(), b[avg_idx].as_f64()));
    rows.truncate(n);
    Ok(Table::new(summary.schema.clone(), rows))
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
