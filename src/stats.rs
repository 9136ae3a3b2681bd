//! Per-column numeric aggregates over parsed rows.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::ingest::Row;

/// Running aggregate for one column, computed over the numeric-coercible
/// subset of its values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Numeric coercion: JSON numbers and numeric strings count, null, booleans
/// and blank strings do not.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Aggregate rows into per-column stats. Columns without a single numeric
/// value are omitted entirely; a purely textual column produces no entry.
pub fn aggregate(rows: &[Row]) -> BTreeMap<String, ColumnStats> {
    let mut totals: BTreeMap<String, (u64, f64, f64, f64)> = BTreeMap::new();

    for row in rows {
        for (column, value) in row {
            let Some(number) = numeric_value(value) else {
                continue;
            };
            totals
                .entry(column.clone())
                .and_modify(|(count, sum, min, max)| {
                    *count += 1;
                    *sum += number;
                    *min = min.min(number);
                    *max = max.max(number);
                })
                .or_insert((1, number, number, number));
        }
    }

    totals
        .into_iter()
        .map(|(column, (count, sum, min, max))| {
            let avg = sum / count as f64;
            (column, ColumnStats { count, sum, min, max, avg })
        })
        .collect()
}

/// All numeric values across the dataset, flattened in row order and
/// column order within each row.
pub fn flatten_numeric(rows: &[Row]) -> Vec<f64> {
    rows.iter()
        .flat_map(|row| row.values().filter_map(numeric_value))
        .collect()
}
