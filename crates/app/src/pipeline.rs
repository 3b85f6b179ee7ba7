use std::sync::Arc;

use khata_classify::{BackgroundClassifier, Classifier};
use khata_core::{ProgressFn, ProgressTracker, StatementDialect, TransactionCandidate};
use khata_import::{
    detect_dialect, map_row, Deduplicator, ImportBatch, ImportCounters, ImportError, RowChunk,
    RowSource,
};
use khata_store::{
    BatchUploader, CancelFlag, PageCache, StoreError, TransactionFetcher, TransactionStore,
    UploadConfig, UploadFailure,
};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("fetching existing transactions failed: {0}")]
    Fetch(#[from] StoreError),
    #[error(transparent)]
    Upload(#[from] UploadFailure),
}

/// Everything one import invocation needs beyond its row source. The
/// cache is caller-owned; the pipeline never keeps global state.
pub struct ImportOptions<'a, S, C> {
    pub store: Arc<S>,
    pub classifier: Option<&'a BackgroundClassifier<C>>,
    pub cache: &'a PageCache,
    /// Cache key for this authenticated owner's fetched records.
    pub owner: String,
    pub forced_dialect: Option<StatementDialect>,
    pub chunk_rows: usize,
    pub upload: UploadConfig,
    pub fetch: khata_store::FetchLimits,
    pub cancel: CancelFlag,
    pub progress: Option<ProgressFn>,
}

/// What an import reports back on success.
#[derive(Debug)]
pub struct ImportReport {
    pub batch_id: Uuid,
    pub dialect: StatementDialect,
    pub counters: ImportCounters,
    /// The seen-set seed was cut short by a fetch safety bound.
    pub fetch_truncated: bool,
}

/// Run one import: seed the seen-set from persisted records, then stream
/// parse → map → dedup → classify → upload.
///
/// Parsing runs on a blocking thread and feeds a bounded channel; the only
/// other suspension point on the parse side is upload backpressure inside
/// the session. Each pipeline invocation owns its own dedup set and
/// counters; concurrent imports share nothing.
pub async fn run_import<S, C>(
    source: RowSource,
    options: ImportOptions<'_, S, C>,
) -> Result<ImportReport, PipelineError>
where
    S: TransactionStore + 'static,
    C: Classifier,
{
    let mut batch = ImportBatch::new();
    let mut progress = ProgressTracker::new(options.progress);

    // ── Seed the seen-set ─────────────────────────────────────────────────
    let existing = match options.cache.get(&options.owner) {
        Some(cached) => cached,
        None => {
            let fetcher = TransactionFetcher::new(options.store.as_ref(), options.fetch.clone());
            let result = fetcher.fetch_all(&options.cancel).await?;
            options.cache.put(&options.owner, result)
        }
    };
    let fetch_truncated = existing.truncated;
    if fetch_truncated {
        tracing::warn!(
            rows = existing.records.len(),
            "seen-set seed is truncated; dedup against older records is best-effort"
        );
    }
    let mut dedup = Deduplicator::with_seen(existing.records.iter().map(|r| r.fingerprint()));
    drop(existing);

    // ── Stream chunks off a blocking parser thread ────────────────────────
    let (tx, mut rx) = mpsc::channel::<Result<RowChunk, ImportError>>(4);
    let chunk_rows = options.chunk_rows.max(1);
    let producer = tokio::task::spawn_blocking(move || {
        for chunk in source.chunks(chunk_rows) {
            if tx.blocking_send(chunk).is_err() {
                // Receiver dropped: import aborted or cancelled.
                break;
            }
        }
    });

    let uploader = BatchUploader::new(options.store.clone(), options.upload.clone());
    let mut session = uploader.session(options.cancel.clone());
    let mut dialect: Option<StatementDialect> = options.forced_dialect;
    let mut parse_error: Option<ImportError> = None;
    let mut dispatch_error: Option<StoreError> = None;

    while let Some(item) = rx.recv().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                parse_error = Some(e);
                break;
            }
        };
        if options.cancel.is_cancelled() {
            break;
        }

        batch.counters.parsed += chunk.rows.len() as u64;

        let dialect = match dialect {
            Some(d) => d,
            None => match chunk.rows.first().map(|r| detect_dialect(&r.normalized_headers())) {
                Some(Some(detected)) => {
                    tracing::info!(dialect = %detected, "detected statement dialect");
                    dialect = Some(detected);
                    detected
                }
                _ => {
                    parse_error = Some(ImportError::UnsupportedFormat);
                    break;
                }
            },
        };

        for row in &chunk.rows {
            let Some(candidate) = map_row(dialect, row) else {
                continue;
            };
            batch.counters.mapped += 1;
            if dedup.accept(&candidate) {
                batch.candidates.push(candidate);
            } else {
                batch.counters.deduplicated += 1;
            }
        }

        apply_categories(options.classifier, &mut batch.candidates).await;

        // The batch hands its ordered candidates to the uploader chunk by
        // chunk so a large file never lives in memory whole.
        if let Err(error) = session.push(std::mem::take(&mut batch.candidates)).await {
            dispatch_error = Some(error);
            break;
        }
        progress.update(chunk.percent);

        if session.aborted() {
            break;
        }
    }

    // Stop the producer before settling; a failed upload must not keep
    // parsing a large file in the background.
    drop(rx);
    let _ = producer.await;

    if let Some(e) = parse_error {
        // Fatal parse problems outrank whatever the uploader was doing.
        let _ = session.finish().await;
        return Err(e.into());
    }
    if batch.counters.parsed == 0 {
        let _ = session.finish().await;
        return Err(ImportError::NoRows.into());
    }
    if let Some(error) = dispatch_error {
        let outcome = match session.finish().await {
            Ok(outcome) => outcome,
            Err(failure) => return Err(failure.into()),
        };
        return Err(UploadFailure { error, outcome }.into());
    }

    let outcome = session.finish().await?;
    batch.counters.inserted = outcome.inserted;

    // New rows change what the next fetch should see.
    options.cache.invalidate(&options.owner);
    progress.finish();

    let dialect = dialect.unwrap_or(StatementDialect::Generic);
    tracing::info!(
        batch_id = %batch.id,
        parsed = batch.counters.parsed,
        mapped = batch.counters.mapped,
        deduplicated = batch.counters.deduplicated,
        inserted = batch.counters.inserted,
        "import complete"
    );

    Ok(ImportReport {
        batch_id: batch.id,
        dialect,
        counters: batch.counters,
        fetch_truncated,
    })
}

/// Overwrite heuristic categories with the classifier's answers where it
/// has any. Failure or timeout leaves every candidate on its heuristic
/// category; the classifier can never block or break the import.
async fn apply_categories<C: Classifier>(
    classifier: Option<&BackgroundClassifier<C>>,
    candidates: &mut [TransactionCandidate],
) {
    let Some(classifier) = classifier else {
        return;
    };
    if candidates.is_empty() {
        return;
    }

    let descriptions: Vec<String> = candidates.iter().map(|c| c.description.clone()).collect();
    let categories = classifier.classify(&descriptions).await;
    if categories.is_empty() {
        return;
    }
    for candidate in candidates.iter_mut() {
        if let Some(category) = categories.get(&candidate.description) {
            candidate.category = category.clone();
        }
    }
}
