use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use khata_core::TransactionCandidate;

use crate::api::{PageRequest, StoreError, StoredTransaction, TransactionStore};

/// In-memory [`TransactionStore`].
///
/// Stands in for the persistence API in tests and `--dry-run` imports, the
/// way the OCR pipeline's mock backend stands in for its engine. Failures
/// and latency can be injected per call, and every insert is recorded so
/// tests can assert on dispatch counts and chunk sizes.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredTransaction>>,
    /// Sizes of insert batches, in completion order.
    insert_log: Mutex<Vec<usize>>,
    /// 1-based insert call counters that should fail with an API error.
    fail_on_insert: Mutex<Vec<u64>>,
    /// Description substring marking a batch that should fail.
    fail_marker: Mutex<Option<String>>,
    insert_calls: AtomicU64,
    page_calls: AtomicU64,
    insert_delay: Mutex<Option<Duration>>,
    page_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<StoredTransaction>) -> Self {
        let store = Self::new();
        *store.rows.lock().expect("store lock") = rows;
        store
    }

    /// Make the Nth insert call (1-based) fail with an API error.
    pub fn fail_insert_call(&self, call: u64) {
        self.fail_on_insert.lock().expect("store lock").push(call);
    }

    /// Fail any insert whose batch contains a matching description.
    /// Content-keyed failure stays deterministic no matter how the runtime
    /// schedules concurrent chunks.
    pub fn fail_when_contains(&self, marker: impl Into<String>) {
        *self.fail_marker.lock().expect("store lock") = Some(marker.into());
    }

    pub fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock().expect("store lock") = Some(delay);
    }

    pub fn set_page_delay(&self, delay: Duration) {
        *self.page_delay.lock().expect("store lock") = Some(delay);
    }

    pub fn insert_call_count(&self) -> u64 {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn page_call_count(&self) -> u64 {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn inserted_batch_sizes(&self) -> Vec<usize> {
        self.insert_log.lock().expect("store lock").clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("store lock").len()
    }

    /// Highest number of insert calls that were ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl TransactionStore for MemoryStore {
    async fn insert_batch(&self, batch: Vec<TransactionCandidate>) -> Result<u64, StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.insert_delay.lock().expect("store lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let should_fail = self
            .fail_on_insert
            .lock()
            .expect("store lock")
            .contains(&call);
        if should_fail {
            return Err(StoreError::Api {
                status: 500,
                message: format!("injected failure on insert call {call}"),
            });
        }

        let marker = self.fail_marker.lock().expect("store lock").clone();
        if let Some(marker) = marker {
            if batch.iter().any(|c| c.description.contains(&marker)) {
                return Err(StoreError::Api {
                    status: 500,
                    message: format!("injected failure on batch containing '{marker}'"),
                });
            }
        }

        let mut rows = self.rows.lock().expect("store lock");
        for candidate in &batch {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            rows.push(StoredTransaction {
                id: format!("m{id}"),
                date: candidate.date,
                amount: candidate.amount,
                description: candidate.description.clone(),
            });
        }
        self.insert_log.lock().expect("store lock").push(batch.len());
        Ok(batch.len() as u64)
    }

    async fn fetch_page(&self, req: PageRequest) -> Result<Vec<StoredTransaction>, StoreError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.page_delay.lock().expect("store lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rows = self.rows.lock().expect("store lock");
        let mut sorted: Vec<&StoredTransaction> = rows.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

        Ok(sorted
            .into_iter()
            .skip(req.offset as usize)
            .take(req.limit as usize)
            .cloned()
            .collect())
    }
}
