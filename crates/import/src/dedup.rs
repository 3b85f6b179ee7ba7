use std::collections::HashSet;

use khata_core::{Fingerprint, TransactionCandidate};

/// Fingerprint-based duplicate rejection.
///
/// The seen-set is pre-seeded with fingerprints of already-persisted
/// records, so re-importing a file never creates a second copy of anything.
/// Acceptance is order-dependent and deterministic: among textually
/// identical candidates, the first in arrival order wins.
pub struct Deduplicator {
    seen: HashSet<Fingerprint>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    pub fn with_seen(seen: impl IntoIterator<Item = Fingerprint>) -> Self {
        Self {
            seen: seen.into_iter().collect(),
        }
    }

    /// Returns true if the candidate is new (and records it), false if its
    /// fingerprint was already seen.
    pub fn accept(&mut self, candidate: &TransactionCandidate) -> bool {
        self.seen.insert(candidate.fingerprint())
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}
