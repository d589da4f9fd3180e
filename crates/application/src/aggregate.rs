//! Aggregation over the filtered-but-unpaged row set.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::debug;

/// Computes the requested aggregates over the unpaged filtered rows.
///
/// `requests` maps a field identifier to an aggregate function name. Results
/// are keyed `{field}_{function}`. Unknown function names are skipped rather
/// than erroring so that callers can probe newer functions without breaking
/// older engines; fields absent from every row simply contribute nothing.
#[must_use]
pub fn aggregate_rows(
    rows: &[Value],
    requests: &BTreeMap<String, String>,
) -> BTreeMap<String, Value> {
    let mut aggregations = BTreeMap::new();

    for (field, function) in requests {
        let key = format!("{field}_{function}");
        let computed = match function.as_str() {
            "count" => Some(json!(rows.len())),
            "avg" => average(rows, field),
            "sum" => numeric_values(rows, field)
                .reduce(|left, right| left + right)
                .map(|total| json!(total)),
            "min" => extreme(rows, field, false),
            "max" => extreme(rows, field, true),
            "group_count" => Some(group_count(rows, field)),
            other => {
                debug!(field = %field, function = %other, "ignoring unknown aggregate function");
                None
            }
        };

        if let Some(value) = computed {
            aggregations.insert(key, value);
        }
    }

    aggregations
}

fn field_values<'a>(rows: &'a [Value], field: &'a str) -> impl Iterator<Item = &'a Value> {
    rows.iter()
        .filter_map(move |row| row.as_object().and_then(|object| object.get(field)))
        .filter(|value| !value.is_null())
}

fn numeric_values<'a>(rows: &'a [Value], field: &'a str) -> impl Iterator<Item = f64> {
    field_values(rows, field).filter_map(Value::as_f64)
}

fn average(rows: &[Value], field: &str) -> Option<Value> {
    let mut total = 0.0;
    let mut count = 0usize;
    for value in numeric_values(rows, field) {
        total += value;
        count += 1;
    }

    (count > 0).then(|| json!(total / count as f64))
}

fn extreme(rows: &[Value], field: &str, take_max: bool) -> Option<Value> {
    let numbers: Vec<f64> = numeric_values(rows, field).collect();
    if !numbers.is_empty() {
        let folded = numbers
            .into_iter()
            .reduce(|left, right| match (take_max, left < right) {
                (true, true) | (false, false) => right,
                _ => left,
            });
        return folded.map(|value| json!(value));
    }

    let folded = field_values(rows, field)
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .reduce(|left, right| match (take_max, left < right) {
            (true, true) | (false, false) => right,
            _ => left,
        });
    folded.map(|value| json!(value))
}

fn group_count(rows: &[Value], field: &str) -> Value {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for value in field_values(rows, field) {
        let key = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut object = Map::new();
    for (value, count) in counts {
        object.insert(value, json!(count));
    }

    Value::Object(object)
}
