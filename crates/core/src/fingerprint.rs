use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic dedup key for a transaction.
///
/// `<iso date, seconds precision>|<amount to 2dp>|<lowercased description>`.
/// Two candidates with equal fingerprints are the same transaction no
/// matter what their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(date: &NaiveDateTime, amount: Decimal, description: &str) -> Self {
        // %Y-%m-%dT%H:%M:%S is exactly the first 19 chars of an ISO instant.
        let iso = date.format("%Y-%m-%dT%H:%M:%S");
        Fingerprint(format!(
            "{iso}|{}|{}",
            format_2dp(amount),
            description.to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Fingerprint(s)
    }
}

/// Render an amount with exactly two decimal places, sign included.
/// Half-way cases round away from zero, matching how the persisted records
/// were formatted historically.
fn format_2dp(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let mut s = rounded.to_string();
    match s.find('.') {
        None => s.push_str(".00"),
        Some(pos) => {
            if s.len() - pos - 1 == 1 {
                s.push('0');
            }
        }
    }
    s
}
