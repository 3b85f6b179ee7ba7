use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::Fingerprint;

/// Terminal state of a statement row, as reported by the source export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl TxnStatus {
    /// Forgiving parse of whatever the export calls the status. Unknown
    /// labels count as completed, since statements only list settled rows.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_lowercase();
        if l.contains("refund") {
            TxnStatus::Refunded
        } else if l.contains("cancel") {
            TxnStatus::Cancelled
        } else if l.contains("fail") || l.contains("declin") {
            TxnStatus::Failed
        } else {
            TxnStatus::Completed
        }
    }
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnStatus::Completed => write!(f, "completed"),
            TxnStatus::Failed => write!(f, "failed"),
            TxnStatus::Cancelled => write!(f, "cancelled"),
            TxnStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// Payment rail named in the narration, where one is recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRail {
    Upi,
    Pos,
    Atm,
    Neft,
    Imps,
    Cash,
    Netbanking,
}

impl fmt::Display for PaymentRail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentRail::Upi => write!(f, "UPI"),
            PaymentRail::Pos => write!(f, "POS"),
            PaymentRail::Atm => write!(f, "ATM"),
            PaymentRail::Neft => write!(f, "NEFT"),
            PaymentRail::Imps => write!(f, "IMPS"),
            PaymentRail::Cash => write!(f, "Cash"),
            PaymentRail::Netbanking => write!(f, "Netbanking"),
        }
    }
}

/// The statement layout a file was recognized as. Detection priority is
/// Google → Upi → Bank → Generic; the first matching predicate wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementDialect {
    Google,
    Upi,
    Bank,
    Generic,
}

impl fmt::Display for StatementDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementDialect::Google => write!(f, "google"),
            StatementDialect::Upi => write!(f, "upi"),
            StatementDialect::Bank => write!(f, "bank"),
            StatementDialect::Generic => write!(f, "generic"),
        }
    }
}

impl std::str::FromStr for StatementDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(StatementDialect::Google),
            "upi" => Ok(StatementDialect::Upi),
            "bank" => Ok(StatementDialect::Bank),
            "generic" => Ok(StatementDialect::Generic),
            other => Err(format!("unknown statement dialect: '{other}'")),
        }
    }
}

/// A fully normalized transaction, ready for dedup and persistence.
/// `raw` keeps the original row for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCandidate {
    pub date: NaiveDateTime,
    /// Signed amount: positive = money in, negative = money out.
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub merchant: String,
    pub category: String,
    pub payment_method: Option<PaymentRail>,
    pub status: TxnStatus,
    pub raw: serde_json::Value,
}

impl TransactionCandidate {
    /// Recompute the dedup key from this candidate's own normalized fields.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(&self.date, self.amount, &self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_normalize() {
        assert_eq!(TxnStatus::from_label("Refunded"), TxnStatus::Refunded);
        assert_eq!(TxnStatus::from_label("REFUND ISSUED"), TxnStatus::Refunded);
        assert_eq!(TxnStatus::from_label("Cancelled"), TxnStatus::Cancelled);
        assert_eq!(TxnStatus::from_label("Payment Failed"), TxnStatus::Failed);
        assert_eq!(TxnStatus::from_label("Declined"), TxnStatus::Failed);
    }

    #[test]
    fn unknown_status_counts_as_completed() {
        assert_eq!(TxnStatus::from_label("Complete"), TxnStatus::Completed);
        assert_eq!(TxnStatus::from_label(""), TxnStatus::Completed);
        assert_eq!(TxnStatus::from_label("whatever"), TxnStatus::Completed);
    }

    #[test]
    fn dialect_parses_from_cli_strings() {
        use std::str::FromStr;
        assert_eq!(StatementDialect::from_str("google").unwrap(), StatementDialect::Google);
        assert_eq!(StatementDialect::from_str("BANK").unwrap(), StatementDialect::Bank);
        assert!(StatementDialect::from_str("hdfc").is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let s = serde_json::to_string(&TxnStatus::Refunded).unwrap();
        assert_eq!(s, "\"refunded\"");
    }
}
