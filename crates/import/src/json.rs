use khata_core::{CellValue, RawRow};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::ImportError;

/// Parse a JSON export into rows.
///
/// Accepts either a top-level array of objects or an object carrying a
/// `transactions` array. Any other shape yields zero rows (the pipeline
/// turns that into its fatal no-rows error). Malformed JSON is fatal here.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ImportError::Json(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("transactions") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let rows = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => {
                let mut row = RawRow::new();
                for (key, value) in fields {
                    row.push(key, json_to_cell(value));
                }
                (!row.is_blank()).then_some(row)
            }
            _ => None,
        })
        .collect();

    Ok(rows)
}

fn json_to_cell(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(s) => CellValue::from(s.as_str()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Number(Decimal::from(i))
            } else {
                n.as_f64()
                    .and_then(Decimal::from_f64)
                    .map(CellValue::Number)
                    .unwrap_or(CellValue::Empty)
            }
        }
        Value::Bool(b) => CellValue::Text(b.to_string()),
        // Nested structures are opaque to mapping but kept as text for audit.
        nested => CellValue::Text(nested.to_string()),
    }
}
