use std::io::{Cursor, Read};

use crate::{CsvChunks, ImportError, RowSource, CHUNK_ROWS};

/// Delimiters tried when sniffing a text table, in tie-break order.
const CANDIDATES: &[u8] = &[b',', b'\t', b'|', b';'];

/// Pick the delimiter that splits the header line into the most fields.
/// Ties go to the earlier candidate, so plain comma text stays CSV.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let mut best = b',';
    let mut best_fields = 0usize;
    for &delim in CANDIDATES {
        let fields = header_line.split(delim as char).count();
        if fields > best_fields {
            best_fields = fields;
            best = delim;
        }
    }
    best
}

/// Treat a text or PDF-as-text payload as a delimited table: sniff the
/// delimiter from the first non-empty line, then stream it like CSV.
pub fn from_bytes(bytes: Vec<u8>) -> Result<RowSource, ImportError> {
    let header_line = first_non_empty_line(&bytes);
    let delimiter = sniff_delimiter(&header_line);
    tracing::debug!(delimiter = %(delimiter as char), "sniffed text delimiter");

    let size = bytes.len() as u64;
    let reader: Box<dyn Read + Send> = Box::new(Cursor::new(bytes));
    Ok(RowSource::Streaming(CsvChunks::new(
        reader, size, delimiter, CHUNK_ROWS,
    )?))
}

fn first_non_empty_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}
