use khata_core::TransactionCandidate;
use uuid::Uuid;

/// Row counters for one import invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounters {
    /// Rows extracted from the file.
    pub parsed: u64,
    /// Rows successfully mapped to candidates.
    pub mapped: u64,
    /// Candidates discarded as duplicates.
    pub deduplicated: u64,
    /// Rows confirmed inserted by the persistence API.
    pub inserted: u64,
}

impl ImportCounters {
    /// Rows dropped during mapping (bad date/amount, ambiguous sign).
    pub fn dropped(&self) -> u64 {
        self.parsed.saturating_sub(self.mapped)
    }
}

/// Everything one import invocation owns: the accepted candidates in
/// arrival order plus its counters. Destroyed on completion or failure;
/// nothing is shared across concurrent imports.
#[derive(Debug)]
pub struct ImportBatch {
    pub id: Uuid,
    pub candidates: Vec<TransactionCandidate>,
    pub counters: ImportCounters,
}

impl ImportBatch {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            candidates: Vec::new(),
            counters: ImportCounters::default(),
        }
    }
}

impl Default for ImportBatch {
    fn default() -> Self {
        Self::new()
    }
}
