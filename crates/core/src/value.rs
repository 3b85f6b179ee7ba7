use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// A single untyped cell from a source statement row.
///
/// Statement files carry strings, numbers, or nothing at all; keeping the
/// distinction explicit avoids the silent coercion bugs that duck-typed row
/// access invites across dialects.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(Decimal),
    Empty,
}

impl CellValue {
    /// True for `Empty` and for whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// String rendering used when a textual field (date, description, type)
    /// arrives as a number cell.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            CellValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Number(n) => serde_json::to_value(n).unwrap_or(Value::Null),
            CellValue::Empty => Value::Null,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

/// Lowercase a header and strip everything but ASCII alphanumerics.
/// `"Withdrawal Amt."` and `"withdrawal_amt"` normalize to the same key.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// One source row: an insertion-ordered mapping from header name to cell.
///
/// Lookups go through [`normalize_header`], so callers ask for `"withdrawalamt"`
/// and match `"Withdrawal Amt."` regardless of the file's punctuation habits.
/// Rows are transient: they are destroyed once mapped to a candidate, with
/// [`RawRow::to_json`] preserving the original content for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, header: impl Into<String>, value: CellValue) {
        self.cells.push((header.into(), value));
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells blank — footer/padding rows in bank exports look like this.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }

    /// Look up a cell by normalized header key.
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        let key = normalize_header(key);
        self.cells
            .iter()
            .find(|(h, _)| normalize_header(h) == key)
            .map(|(_, v)| v)
    }

    /// First non-blank cell among the given normalized keys, in key order.
    /// Mapping rules express their column priority lists through this.
    pub fn first_of(&self, keys: &[&str]) -> Option<&CellValue> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find(|v| !v.is_blank())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    /// The normalized header set used for dialect detection.
    pub fn normalized_headers(&self) -> std::collections::BTreeSet<String> {
        self.cells
            .iter()
            .map(|(h, _)| normalize_header(h))
            .filter(|h| !h.is_empty())
            .collect()
    }

    /// Serialize the original row for the candidate's audit field.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.cells.len());
        for (header, value) in &self.cells {
            map.insert(header.clone(), value.to_json());
        }
        Value::Object(map)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        use rust_decimal::prelude::FromPrimitive;
        Decimal::from_f64(f)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Empty)
    }
}
