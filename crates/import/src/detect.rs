/// Upload size cap, matching the ingestion API's limit.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// What kind of statement file a name points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
    Json,
    Text,
    Pdf,
    Unknown,
}

/// Classify a file by extension. `Unknown` is terminal: the import rejects
/// the file as an unsupported type before reading a byte.
pub fn detect_kind(file_name: &str) -> FileKind {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => FileKind::Csv,
        "xls" | "xlsx" | "xlsm" => FileKind::Excel,
        "json" => FileKind::Json,
        "tsv" | "txt" => FileKind::Text,
        "pdf" => FileKind::Pdf,
        _ => FileKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(detect_kind("statement.csv"), FileKind::Csv);
        assert_eq!(detect_kind("Statement.XLSX"), FileKind::Excel);
        assert_eq!(detect_kind("macro.xlsm"), FileKind::Excel);
        assert_eq!(detect_kind("legacy.xls"), FileKind::Excel);
        assert_eq!(detect_kind("export.json"), FileKind::Json);
        assert_eq!(detect_kind("dump.tsv"), FileKind::Text);
        assert_eq!(detect_kind("extracted.txt"), FileKind::Text);
        assert_eq!(detect_kind("statement.pdf"), FileKind::Pdf);
    }

    #[test]
    fn unknown_or_missing_extension() {
        assert_eq!(detect_kind("statement.docx"), FileKind::Unknown);
        assert_eq!(detect_kind("statement"), FileKind::Unknown);
        assert_eq!(detect_kind(""), FileKind::Unknown);
    }

    #[test]
    fn only_last_extension_counts() {
        assert_eq!(detect_kind("backup.csv.gz"), FileKind::Unknown);
        assert_eq!(detect_kind("jan.2024.csv"), FileKind::Csv);
    }
}
