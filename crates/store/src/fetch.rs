use std::collections::HashSet;
use std::time::Duration;

use tokio::time::{timeout, Instant};

use crate::api::{CancelFlag, PageRequest, StoreError, StoredTransaction, TransactionStore};

/// Safety bounds for a full fetch. Every stop condition except a natural
/// empty page marks the result truncated instead of failing.
#[derive(Debug, Clone)]
pub struct FetchLimits {
    pub page_size: u32,
    pub max_rows: Option<u64>,
    pub max_pages: Option<u32>,
    pub max_duration: Option<Duration>,
    /// Per-page request timeout. Unlike the soft bounds above, tripping
    /// this is fatal to the whole fetch.
    pub page_timeout: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_rows: Some(100_000),
            max_pages: None,
            max_duration: Some(Duration::from_secs(30)),
            page_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of paging through the persisted records.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub records: Vec<StoredTransaction>,
    /// True when any safety bound cut the fetch short.
    pub truncated: bool,
}

/// Identity of one page: first id, last id, row count. A repeat means the
/// server's pagination is drifting underneath us and further pages would
/// loop forever.
type PageSignature = (String, String, usize);

/// Sequentially pages through persisted records, newest first.
///
/// Pages are requested strictly one at a time — the loop guard and the
/// stable ordering both depend on it.
pub struct TransactionFetcher<'a, S> {
    store: &'a S,
    limits: FetchLimits,
}

impl<'a, S: TransactionStore> TransactionFetcher<'a, S> {
    pub fn new(store: &'a S, limits: FetchLimits) -> Self {
        Self { store, limits }
    }

    pub async fn fetch_all(&self, cancel: &CancelFlag) -> Result<FetchResult, StoreError> {
        let started = Instant::now();
        let mut records: Vec<StoredTransaction> = Vec::new();
        let mut signatures: HashSet<PageSignature> = HashSet::new();
        let mut truncated = false;
        let mut page_index: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                truncated = true;
                break;
            }
            if let Some(max_pages) = self.limits.max_pages {
                if page_index >= max_pages {
                    truncated = true;
                    break;
                }
            }
            if let Some(max_duration) = self.limits.max_duration {
                if started.elapsed() >= max_duration {
                    truncated = true;
                    break;
                }
            }

            let req = PageRequest {
                offset: records.len() as u64,
                limit: self.limits.page_size,
            };
            let page = timeout(self.limits.page_timeout, self.store.fetch_page(req))
                .await
                .map_err(|_| StoreError::PageTimeout)??;

            if page.is_empty() {
                break;
            }

            let signature = signature_of(&page);
            if !signatures.insert(signature) {
                tracing::warn!(page = page_index, "repeated page signature, stopping fetch");
                truncated = true;
                break;
            }

            records.extend(page);
            page_index += 1;

            if let Some(max_rows) = self.limits.max_rows {
                if records.len() as u64 >= max_rows {
                    records.truncate(max_rows as usize);
                    truncated = true;
                    break;
                }
            }
        }

        Ok(FetchResult { records, truncated })
    }
}

fn signature_of(page: &[StoredTransaction]) -> PageSignature {
    let first = page.first().map(|r| r.id.clone()).unwrap_or_default();
    let last = page.last().map(|r| r.id.clone()).unwrap_or_default();
    (first, last, page.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn rows(n: u64) -> Vec<StoredTransaction> {
        (0..n)
            .map(|i| StoredTransaction {
                // Zero-padded ids keep id order aligned with date order.
                id: format!("r{i:07}"),
                date: NaiveDate::from_ymd_opt(2020, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::minutes(i as i64),
                amount: Decimal::from(-5),
                description: format!("txn {i}"),
            })
            .collect()
    }

    fn limits(page_size: u32, max_rows: Option<u64>) -> FetchLimits {
        FetchLimits {
            page_size,
            max_rows,
            max_pages: None,
            max_duration: None,
            page_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn drains_everything_when_no_bound_is_hit() {
        let store = MemoryStore::with_rows(rows(2_500));
        let fetcher = TransactionFetcher::new(&store, limits(1000, None));
        let result = fetcher.fetch_all(&CancelFlag::new()).await.unwrap();
        assert_eq!(result.records.len(), 2_500);
        assert!(!result.truncated);
        // 3 pages of data plus the empty terminator.
        assert_eq!(store.page_call_count(), 4);
    }

    #[tokio::test]
    async fn max_rows_bound_truncates_at_exactly_the_bound() {
        // Scaled-down version of the 250k/100k scenario: the fetch returns
        // exactly the first max_rows in sort order and reports truncation.
        let store = MemoryStore::with_rows(rows(2_500));
        let fetcher = TransactionFetcher::new(&store, limits(100, Some(1_000)));
        let result = fetcher.fetch_all(&CancelFlag::new()).await.unwrap();
        assert_eq!(result.records.len(), 1_000);
        assert!(result.truncated);
        // Newest first: the very newest row is first.
        assert_eq!(result.records[0].id, "r0002499");
        assert_eq!(result.records[999].id, "r0001500");
    }

    #[tokio::test]
    async fn ordering_is_descending_by_timestamp() {
        let store = MemoryStore::with_rows(rows(250));
        let fetcher = TransactionFetcher::new(&store, limits(100, None));
        let result = fetcher.fetch_all(&CancelFlag::new()).await.unwrap();
        for pair in result.records.windows(2) {
            assert!(pair[0].date >= pair[1].date);
        }
    }

    #[tokio::test]
    async fn max_pages_bound_marks_truncated() {
        let store = MemoryStore::with_rows(rows(500));
        let mut l = limits(100, None);
        l.max_pages = Some(2);
        let fetcher = TransactionFetcher::new(&store, l);
        let result = fetcher.fetch_all(&CancelFlag::new()).await.unwrap();
        assert_eq!(result.records.len(), 200);
        assert!(result.truncated);
    }

    #[tokio::test(start_paused = true)]
    async fn page_timeout_is_fatal() {
        let store = MemoryStore::with_rows(rows(100));
        store.set_page_delay(Duration::from_secs(60));
        let mut l = limits(50, None);
        l.page_timeout = Duration::from_secs(1);
        let fetcher = TransactionFetcher::new(&store, l);
        let err = fetcher.fetch_all(&CancelFlag::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::PageTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_bound_marks_truncated() {
        let store = MemoryStore::with_rows(rows(1_000));
        store.set_page_delay(Duration::from_secs(2));
        let mut l = limits(100, None);
        l.max_duration = Some(Duration::from_secs(3));
        let fetcher = TransactionFetcher::new(&store, l);
        let result = fetcher.fetch_all(&CancelFlag::new()).await.unwrap();
        assert!(result.truncated);
        assert!(result.records.len() < 1_000);
    }

    /// A store whose pagination is broken: every offset returns the same
    /// page, the way a server with drifting sort keys can behave.
    struct LoopingStore {
        page: Vec<StoredTransaction>,
    }

    impl TransactionStore for LoopingStore {
        async fn insert_batch(
            &self,
            _rows: Vec<khata_core::TransactionCandidate>,
        ) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn fetch_page(
            &self,
            _req: PageRequest,
        ) -> Result<Vec<StoredTransaction>, StoreError> {
            Ok(self.page.clone())
        }
    }

    #[tokio::test]
    async fn repeated_page_signature_trips_the_loop_guard() {
        let store = LoopingStore { page: rows(100) };
        let fetcher = TransactionFetcher::new(&store, limits(100, None));
        let result = fetcher.fetch_all(&CancelFlag::new()).await.unwrap();
        // One page accepted, the repeat detected, fetch marked partial.
        assert_eq!(result.records.len(), 100);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn cancelled_fetch_stops_requesting_pages() {
        let store = MemoryStore::with_rows(rows(500));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let fetcher = TransactionFetcher::new(&store, limits(100, None));
        let result = fetcher.fetch_all(&cancel).await.unwrap();
        assert!(result.truncated);
        assert!(result.records.is_empty());
        assert_eq!(store.page_call_count(), 0);
    }
}
