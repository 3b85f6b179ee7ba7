pub mod amount;
pub mod candidate;
pub mod category;
pub mod dates;
pub mod describe;
pub mod fingerprint;
pub mod progress;
pub mod value;

pub use candidate::{PaymentRail, StatementDialect, TransactionCandidate, TxnStatus};
pub use fingerprint::Fingerprint;
pub use progress::{ProgressFn, ProgressTracker};
pub use value::{normalize_header, CellValue, RawRow};
