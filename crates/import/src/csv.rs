use std::io::Read;

use khata_core::{CellValue, RawRow};

use crate::ImportError;

/// Rows pulled per chunk. Large files are parsed chunk-by-chunk so peak
/// memory is bounded by this, not by the file size.
pub const CHUNK_ROWS: usize = 500;

/// One parsed chunk plus how far through the file (by bytes) the reader is.
/// The percentage is capped at 99; only the pipeline's terminal signal may
/// report completion.
#[derive(Debug)]
pub struct RowChunk {
    pub rows: Vec<RawRow>,
    pub percent: u8,
}

/// Streaming CSV reader producing [`RawRow`] chunks.
///
/// The header record is read eagerly at construction so dialect detection
/// can happen on the first chunk. Cells stay textual — CSV carries no type
/// information, and guessing numbers here would reintroduce the coercion
/// problems the typed row exists to prevent.
pub struct CsvChunks<R: Read> {
    reader: ::csv::Reader<R>,
    headers: Vec<String>,
    total_bytes: u64,
    chunk_rows: usize,
    /// 1-based data row counter, for error context.
    row: u64,
    done: bool,
}

impl<R: Read> CsvChunks<R> {
    pub fn new(
        input: R,
        total_bytes: u64,
        delimiter: u8,
        chunk_rows: usize,
    ) -> Result<Self, ImportError> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(input);

        let headers = reader
            .headers()
            .map_err(|e| ImportError::Malformed {
                row: 0,
                message: e.to_string(),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            reader,
            headers,
            total_bytes,
            chunk_rows: chunk_rows.max(1),
            row: 0,
            done: false,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 99;
        }
        let consumed = self.reader.position().byte();
        ((consumed * 100 / self.total_bytes).min(99)) as u8
    }

    fn record_to_row(&self, record: &::csv::StringRecord) -> RawRow {
        let mut row = RawRow::new();
        for (i, header) in self.headers.iter().enumerate() {
            let value = record
                .get(i)
                .map(CellValue::from)
                .unwrap_or(CellValue::Empty);
            row.push(header.clone(), value);
        }
        row
    }
}

impl<R: Read> Iterator for CsvChunks<R> {
    type Item = Result<RowChunk, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut rows = Vec::with_capacity(self.chunk_rows);
        let mut record = ::csv::StringRecord::new();

        while rows.len() < self.chunk_rows {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.row += 1;
                    let row = self.record_to_row(&record);
                    if !row.is_blank() {
                        rows.push(row);
                    }
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ImportError::Malformed {
                        row: self.row + 1,
                        message: e.to_string(),
                    }));
                }
            }
        }

        if rows.is_empty() {
            return None;
        }
        Some(Ok(RowChunk {
            rows,
            percent: self.percent(),
        }))
    }
}
