use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use khata_core::{CellValue, RawRow};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::ImportError;

/// Parse the first sheet of a workbook into rows.
///
/// Exports with a blank or auto-generated header row ("Column1", bare
/// numbers, empty cells) get their real headers re-derived from the first
/// data row, and every following row shifts up by one.
pub fn parse_excel(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| ImportError::Excel(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Excel("workbook has no sheets".to_string()))?
        .map_err(|e| ImportError::Excel(e.to_string()))?;

    let mut rows_iter = range.rows();
    let Some(first) = rows_iter.next() else {
        return Ok(Vec::new());
    };

    let mut headers: Vec<String> = first.iter().map(cell_to_header).collect();
    if is_synthetic_header(&headers) {
        // Real headers live in the first data row; promote them.
        match rows_iter.next() {
            Some(second) => headers = second.iter().map(cell_to_header).collect(),
            None => return Ok(Vec::new()),
        }
    }

    let mut rows = Vec::new();
    for cells in rows_iter {
        let mut row = RawRow::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = cells.get(i).map(cell_to_value).unwrap_or(CellValue::Empty);
            row.push(header.clone(), value);
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        _ => String::new(),
    }
}

/// True when the header row carries no real column names: all cells blank,
/// bare numbers, or spreadsheet-generated `Column N` style labels.
fn is_synthetic_header(headers: &[String]) -> bool {
    headers.iter().all(|h| {
        let h = h.trim();
        h.is_empty()
            || h.chars().all(|c| c.is_ascii_digit())
            || {
                let lower = h.to_ascii_lowercase();
                let stripped = lower
                    .strip_prefix("column")
                    .or_else(|| lower.strip_prefix("field"))
                    .or_else(|| lower.strip_prefix("unnamed"));
                stripped.is_some_and(|rest| {
                    rest.trim_matches([' ', '_', ':'].as_ref())
                        .chars()
                        .all(|c| c.is_ascii_digit())
                })
            }
    })
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Int(i) => CellValue::Number(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64(*f)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Empty),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        // Dates flow through as ISO text so the normal date chain parses them.
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| CellValue::Text(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(CellValue::Empty),
        Data::DateTimeIso(s) => CellValue::from(s.as_str()),
        Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Error(_) => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_header_detection() {
        let synth = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(is_synthetic_header(&synth(&["", "", ""])));
        assert!(is_synthetic_header(&synth(&["Column1", "Column2"])));
        assert!(is_synthetic_header(&synth(&["Unnamed_0", "Unnamed_1"])));
        assert!(is_synthetic_header(&synth(&["1", "2", "3"])));
        assert!(!is_synthetic_header(&synth(&["Date", "Amount"])));
        assert!(!is_synthetic_header(&synth(&["", "Amount"])));
    }

    #[test]
    fn cell_conversion_keeps_types() {
        assert_eq!(
            cell_to_value(&Data::Int(42)),
            CellValue::Number(Decimal::from(42))
        );
        assert_eq!(cell_to_value(&Data::Empty), CellValue::Empty);
        assert_eq!(
            cell_to_value(&Data::String("  UPI/123/X ".into())),
            CellValue::Text("  UPI/123/X ".into())
        );
    }

    #[test]
    fn float_cells_become_decimals() {
        match cell_to_value(&Data::Float(1234.5)) {
            CellValue::Number(d) => assert_eq!(d, Decimal::from_f64(1234.5).unwrap()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_are_a_fatal_excel_error() {
        let err = parse_excel(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, ImportError::Excel(_)));
    }
}
