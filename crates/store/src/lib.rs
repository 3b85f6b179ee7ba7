pub mod api;
pub mod cache;
pub mod fetch;
pub mod memory;
pub mod rest;
pub mod upload;

pub use api::{CancelFlag, PageRequest, StoreError, StoredTransaction, TransactionStore};
pub use cache::PageCache;
pub use fetch::{FetchLimits, FetchResult, TransactionFetcher};
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use upload::{BatchUploader, UploadConfig, UploadFailure, UploadOutcome, UploadSession};
