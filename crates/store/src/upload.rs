use std::sync::Arc;

use khata_core::{ProgressTracker, TransactionCandidate};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::api::{CancelFlag, StoreError, TransactionStore};

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Candidates per batch-insert call.
    pub chunk_size: usize,
    /// Hard bound on chunk submissions in flight at once.
    pub concurrency: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            concurrency: 4,
        }
    }
}

/// Final tallies for an upload, reported only after every dispatched chunk
/// has settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    pub inserted: u64,
    pub chunks_dispatched: usize,
    pub chunks_succeeded: usize,
}

/// An aborted upload still reports what landed: chunks that succeeded
/// before the failure stay persisted (at-least-once, no compensation).
#[derive(Debug, Error)]
#[error("upload aborted: {error}")]
pub struct UploadFailure {
    #[source]
    pub error: StoreError,
    pub outcome: UploadOutcome,
}

/// Concurrency-bounded chunked persistence.
///
/// Dispatch order is FIFO; completion order is whatever the network gives
/// us. At most `concurrency` chunk submissions are in flight; the
/// semaphore acquire inside [`UploadSession::push`] is the pipeline's
/// backpressure point, the one place parsing may suspend.
pub struct BatchUploader<S> {
    store: Arc<S>,
    config: UploadConfig,
}

impl<S: TransactionStore + 'static> BatchUploader<S> {
    pub fn new(store: Arc<S>, config: UploadConfig) -> Self {
        Self { store, config }
    }

    /// Start a streaming session: candidates are pushed as the parser
    /// produces them and flushed/settled at the end.
    pub fn session(&self, cancel: CancelFlag) -> UploadSession<S> {
        UploadSession {
            store: self.store.clone(),
            config: self.config.clone(),
            cancel,
            semaphore: Arc::new(Semaphore::new(self.config.concurrency.max(1))),
            tasks: JoinSet::new(),
            buffer: Vec::new(),
            settled_rows: 0,
            outcome: UploadOutcome::default(),
            first_error: None,
            progress: None,
        }
    }

    /// Upload a fully-materialized candidate list in one go.
    pub async fn upload(
        &self,
        candidates: Vec<TransactionCandidate>,
        cancel: &CancelFlag,
        progress: Option<ProgressTracker>,
    ) -> Result<UploadOutcome, UploadFailure> {
        let mut session = self.session(cancel.clone());
        if let Some(tracker) = progress {
            session.progress = Some((tracker, candidates.len() as u64));
        }
        if let Err(error) = session.push(candidates).await {
            // Dispatch failed outright; settle whatever is in flight.
            let outcome = session.settle().await;
            return Err(UploadFailure { error, outcome });
        }
        session.finish().await
    }
}

pub struct UploadSession<S> {
    store: Arc<S>,
    config: UploadConfig,
    cancel: CancelFlag,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(u64, Result<u64, StoreError>)>,
    buffer: Vec<TransactionCandidate>,
    settled_rows: u64,
    outcome: UploadOutcome,
    first_error: Option<StoreError>,
    progress: Option<(ProgressTracker, u64)>,
}

impl<S: TransactionStore + 'static> UploadSession<S> {
    /// Whether a chunk failure or cancellation has stopped dispatch. The
    /// caller should stop pushing and call [`UploadSession::finish`].
    pub fn aborted(&self) -> bool {
        self.first_error.is_some() || self.cancel.is_cancelled()
    }

    /// Queue candidates, dispatching every full chunk. Suspends while the
    /// in-flight bound is saturated.
    pub async fn push(&mut self, rows: Vec<TransactionCandidate>) -> Result<(), StoreError> {
        self.buffer.extend(rows);
        while self.buffer.len() >= self.config.chunk_size {
            let chunk: Vec<_> = self.buffer.drain(..self.config.chunk_size).collect();
            self.dispatch(chunk).await?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, chunk: Vec<TransactionCandidate>) -> Result<(), StoreError> {
        self.drain_finished();
        if self.aborted() {
            return Ok(());
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| StoreError::Cancelled)?;

        // A chunk may have failed while we waited for a slot.
        self.drain_finished();
        if self.aborted() {
            return Ok(());
        }

        let store = self.store.clone();
        let rows = chunk.len() as u64;
        self.tasks.spawn(async move {
            let _permit = permit;
            (rows, store.insert_batch(chunk).await)
        });
        self.outcome.chunks_dispatched += 1;
        Ok(())
    }

    fn drain_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
        }
    }

    fn record(&mut self, joined: Result<(u64, Result<u64, StoreError>), tokio::task::JoinError>) {
        match joined {
            Ok((rows, Ok(count))) => {
                self.outcome.inserted += count;
                self.outcome.chunks_succeeded += 1;
                self.settled_rows += rows;
                if let Some((tracker, total)) = &mut self.progress {
                    let percent = (self.settled_rows * 100 / (*total).max(1)).min(99) as u8;
                    tracker.update(percent);
                }
            }
            Ok((_, Err(e))) => {
                tracing::warn!(error = %e, "chunk upload failed, aborting dispatch");
                if self.first_error.is_none() {
                    self.first_error = Some(e);
                }
            }
            Err(join_err) => {
                if self.first_error.is_none() {
                    self.first_error = Some(StoreError::Worker(join_err.to_string()));
                }
            }
        }
    }

    /// Wait for every dispatched chunk to settle and return the tallies.
    async fn settle(&mut self) -> UploadOutcome {
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }
        self.outcome
    }

    /// Flush the remainder, settle all in-flight chunks, and report. The
    /// first chunk error aborts the import; chunks that already succeeded
    /// are not rolled back.
    pub async fn finish(mut self) -> Result<UploadOutcome, UploadFailure> {
        if !self.buffer.is_empty() && !self.aborted() {
            let chunk = std::mem::take(&mut self.buffer);
            if let Err(error) = self.dispatch(chunk).await {
                let outcome = self.settle().await;
                return Err(UploadFailure { error, outcome });
            }
        }

        let outcome = self.settle().await;

        if self.cancel.is_cancelled() && self.first_error.is_none() {
            return Err(UploadFailure {
                error: StoreError::Cancelled,
                outcome,
            });
        }
        match self.first_error.take() {
            Some(error) => Err(UploadFailure { error, outcome }),
            None => {
                if let Some((tracker, _)) = &mut self.progress {
                    tracker.finish();
                }
                Ok(outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn candidates(n: usize) -> Vec<TransactionCandidate> {
        (0..n)
            .map(|i| TransactionCandidate {
                date: NaiveDate::from_ymd_opt(2024, 3, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                amount: Decimal::from(-(i as i64) - 1),
                currency: "INR".to_string(),
                description: format!("txn {i}"),
                merchant: "Test".to_string(),
                category: "Misc".to_string(),
                payment_method: None,
                status: khata_core::TxnStatus::Completed,
                raw: serde_json::Value::Null,
            })
            .collect()
    }

    fn uploader(store: &Arc<MemoryStore>, chunk_size: usize, concurrency: usize) -> BatchUploader<MemoryStore> {
        BatchUploader::new(
            store.clone(),
            UploadConfig {
                chunk_size,
                concurrency,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn five_thousand_rows_make_exactly_three_chunks() {
        let store = Arc::new(MemoryStore::new());
        // A little injected latency keeps every chunk in flight until all
        // three are dispatched, as over a real network.
        store.set_insert_delay(Duration::from_millis(50));
        let up = uploader(&store, 2000, 4);
        let outcome = up
            .upload(candidates(5000), &CancelFlag::new(), None)
            .await
            .unwrap();
        assert_eq!(outcome.chunks_dispatched, 3);
        assert_eq!(outcome.chunks_succeeded, 3);
        assert_eq!(outcome.inserted, 5000);
        assert_eq!(store.insert_call_count(), 3);
        let mut sizes = store.inserted_batch_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1000, 2000, 2000]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_chunk_aborts_after_inflight_settle_without_rollback() {
        let store = Arc::new(MemoryStore::new());
        // "txn 2500" lives in the second chunk of 2000.
        store.fail_when_contains("txn 2500");
        store.set_insert_delay(Duration::from_millis(50));
        let up = uploader(&store, 2000, 4);
        let failure = up
            .upload(candidates(5000), &CancelFlag::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, StoreError::Api { status: 500, .. }));
        assert_eq!(failure.outcome.chunks_dispatched, 3);
        assert_eq!(failure.outcome.chunks_succeeded, 2);
        // Inserted count reflects only the chunks that actually landed,
        // and those stay persisted.
        assert_eq!(failure.outcome.inserted, 3000);
        assert_eq!(store.row_count(), 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_submissions_never_exceed_the_bound() {
        let store = Arc::new(MemoryStore::new());
        store.set_insert_delay(Duration::from_millis(50));
        let up = uploader(&store, 100, 2);
        let outcome = up
            .upload(candidates(1000), &CancelFlag::new(), None)
            .await
            .unwrap();
        assert_eq!(outcome.chunks_dispatched, 10);
        assert!(store.peak_in_flight() <= 2, "bound violated: {}", store.peak_in_flight());
    }

    #[tokio::test]
    async fn early_failure_stops_later_dispatch() {
        let store = Arc::new(MemoryStore::new());
        store.fail_when_contains("txn 0");
        // Concurrency 1 forces strictly serial dispatch, so the failure is
        // always observed before chunk 3 would go out.
        let up = uploader(&store, 100, 1);
        let failure = up
            .upload(candidates(1000), &CancelFlag::new(), None)
            .await
            .unwrap_err();
        assert!(failure.outcome.chunks_dispatched < 10);
        assert_eq!(failure.outcome.inserted, 0);
    }

    #[tokio::test]
    async fn cancellation_stops_new_dispatch_but_settles_in_flight() {
        let store = Arc::new(MemoryStore::new());
        let cancel = CancelFlag::new();
        let up = uploader(&store, 100, 4);
        let mut session = up.session(cancel.clone());
        session.push(candidates(250)).await.unwrap();
        cancel.cancel();
        session.push(candidates(500)).await.unwrap();
        let failure = session.finish().await.unwrap_err();
        assert!(matches!(failure.error, StoreError::Cancelled));
        // The two full chunks pushed before cancellation were dispatched
        // and allowed to finish naturally.
        assert_eq!(failure.outcome.chunks_dispatched, 2);
        assert_eq!(failure.outcome.inserted, 200);
    }

    #[tokio::test]
    async fn streaming_session_chunks_across_pushes() {
        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 100, 4);
        let mut session = up.session(CancelFlag::new());
        for batch in candidates(330).chunks(30) {
            session.push(batch.to_vec()).await.unwrap();
        }
        let outcome = session.finish().await.unwrap();
        assert_eq!(outcome.inserted, 330);
        // 3 full chunks plus the 30-row remainder.
        assert_eq!(outcome.chunks_dispatched, 4);
    }

    #[tokio::test]
    async fn reported_progress_stays_under_hundred_until_finish() {
        use std::sync::Mutex;
        let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tracker = ProgressTracker::new(Some(Box::new(move |p| {
            sink.lock().unwrap().push(p);
        })));

        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 100, 2);
        up.upload(candidates(500), &CancelFlag::new(), Some(tracker))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let (last, rest) = seen.split_last().expect("some progress reported");
        assert_eq!(*last, 100);
        assert!(rest.iter().all(|p| *p < 100));
    }
}
