use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use khata_core::{Fingerprint, TransactionCandidate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("persistence API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("page request timed out")]
    PageTimeout,
    #[error("upload cancelled")]
    Cancelled,
    #[error("upload worker failed: {0}")]
    Worker(String),
}

/// A record as the persistence API returns it. Carries exactly the fields
/// the importer needs to rebuild fingerprints for the seen-set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    pub date: NaiveDateTime,
    pub amount: Decimal,
    pub description: String,
}

impl StoredTransaction {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.date, self.amount, &self.description)
    }
}

/// One page request against the persisted records, ordered by transaction
/// timestamp descending. Paging is offset-based and strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

/// The persistence collaborator, behind a trait so the pipeline can run
/// against the REST implementation or the in-memory one interchangeably.
/// The authenticated owner is implicit in the implementation (token scope);
/// it never appears in any payload.
pub trait TransactionStore: Send + Sync {
    /// Batch-insert candidates; returns the number of rows inserted.
    fn insert_batch(
        &self,
        rows: Vec<TransactionCandidate>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Fetch one page of persisted records, newest first.
    fn fetch_page(
        &self,
        req: PageRequest,
    ) -> impl Future<Output = Result<Vec<StoredTransaction>, StoreError>> + Send;
}

/// Cooperative cancellation for an in-progress import. Cancelling stops
/// new dispatch (chunks, pages); already-issued calls finish or time out
/// on their own.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
