use std::collections::BTreeSet;

use khata_core::{
    amount, category, dates, describe, CellValue, RawRow, StatementDialect,
    TransactionCandidate, TxnStatus,
};
use rust_decimal::Decimal;

/// Column priority lists, expressed as normalized header keys. The first
/// present, non-blank column wins.
const DATE_KEYS: &[&str] = &[
    "date", "time", "timestamp", "transactiondate", "txndate", "valuedate",
    "postingdate", "transdate",
];
const AMOUNT_KEYS: &[&str] = &["amount", "transactionamount", "txnamount", "value", "amt"];
const WITHDRAWAL_KEYS: &[&str] = &[
    "withdrawal", "withdrawalamt", "withdrawalamount", "debit", "debitamount", "dramount", "dr",
];
const DEPOSIT_KEYS: &[&str] = &[
    "deposit", "depositamt", "depositamount", "credit", "creditamount", "cramount", "cr",
];
const DESCRIPTION_KEYS: &[&str] = &[
    "description", "particulars", "details", "narration", "transactiondetails",
    "remarks", "memo", "payee", "merchant",
];
const TYPE_KEYS: &[&str] = &["type", "transactiontype", "txntype", "drcr", "creditdebit"];
const STATUS_KEYS: &[&str] = &["status", "state", "transactionstatus"];
const PRODUCT_KEYS: &[&str] = &["product", "item", "productname", "title"];
const CURRENCY_KEYS: &[&str] = &["currency", "currencycode"];

const DEFAULT_CURRENCY: &str = "INR";

/// Keywords marking an inflow in a type/status text cell.
const CREDIT_WORDS: &[&str] = &[
    "credit", "refund", "receive", "received", "salary", "deposit", "cashback", "income", "cr",
];

fn has_any(headers: &BTreeSet<String>, keys: &[&str]) -> bool {
    keys.iter().any(|k| headers.contains(*k))
}

/// Decide which statement layout a header set belongs to.
///
/// Predicates run in fixed priority order — Google, UPI, Bank, Generic —
/// and the first hit wins. `None` means the whole file is rejected as an
/// unsupported format.
pub fn detect_dialect(headers: &BTreeSet<String>) -> Option<StatementDialect> {
    let google = has_any(headers, AMOUNT_KEYS)
        && has_any(headers, STATUS_KEYS)
        && (has_any(headers, PRODUCT_KEYS) || headers.contains("time"));
    if google {
        return Some(StatementDialect::Google);
    }

    let upi = has_any(headers, AMOUNT_KEYS)
        && has_any(headers, TYPE_KEYS)
        && has_any(headers, DATE_KEYS);
    if upi {
        return Some(StatementDialect::Upi);
    }

    let bank = has_any(headers, DATE_KEYS)
        && has_any(headers, WITHDRAWAL_KEYS)
        && has_any(headers, DEPOSIT_KEYS);
    if bank {
        return Some(StatementDialect::Bank);
    }

    let generic = has_any(headers, AMOUNT_KEYS) && has_any(headers, DATE_KEYS);
    if generic {
        return Some(StatementDialect::Generic);
    }

    None
}

/// Map one raw row to at most one candidate.
///
/// Rows whose required fields (date, amount) fail to parse are dropped —
/// that is non-fatal and counted by the caller. Sign conventions are
/// dialect-specific; the amount parser itself only supplies magnitudes.
pub fn map_row(dialect: StatementDialect, row: &RawRow) -> Option<TransactionCandidate> {
    match dialect {
        StatementDialect::Google => map_google(row),
        StatementDialect::Upi => map_upi(row),
        StatementDialect::Bank => map_bank(row),
        StatementDialect::Generic => map_generic(row),
    }
}

fn cell_text(row: &RawRow, keys: &[&str]) -> Option<String> {
    row.first_of(keys).and_then(CellValue::to_text)
}

fn parse_date(row: &RawRow) -> Option<chrono::NaiveDateTime> {
    dates::parse_datetime(&cell_text(row, DATE_KEYS)?)
}

fn parse_required_amount(row: &RawRow, keys: &[&str]) -> Option<Decimal> {
    amount::parse_cell(row.first_of(keys)?)
}

fn currency(row: &RawRow) -> String {
    cell_text(row, CURRENCY_KEYS).unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn build(
    row: &RawRow,
    date: chrono::NaiveDateTime,
    amount: Decimal,
    raw_description: &str,
    status: TxnStatus,
) -> TransactionCandidate {
    let description = describe::clean_description(raw_description);
    let merchant = describe::merchant_name(raw_description);
    let cat = category::categorize(&description).to_string();
    TransactionCandidate {
        date,
        amount,
        currency: currency(row),
        description,
        merchant,
        category: cat,
        payment_method: describe::detect_rail(raw_description),
        status,
        raw: row.to_json(),
    }
}

/// Wallet export: amount + timestamp required; spend rows are negative
/// unless the status normalizes to refunded.
fn map_google(row: &RawRow) -> Option<TransactionCandidate> {
    let date = parse_date(row)?;
    let magnitude = parse_required_amount(row, AMOUNT_KEYS)?.abs();
    let status = cell_text(row, STATUS_KEYS)
        .map(|s| TxnStatus::from_label(&s))
        .unwrap_or(TxnStatus::Completed);

    let amount = if status == TxnStatus::Refunded {
        magnitude
    } else {
        -magnitude
    };

    let raw_desc = cell_text(row, PRODUCT_KEYS)
        .or_else(|| cell_text(row, DESCRIPTION_KEYS))
        .unwrap_or_default();
    Some(build(row, date, amount, &raw_desc, status))
}

/// UPI app export: amount + timestamp + a transaction-type text; sign
/// follows the type keywords.
fn map_upi(row: &RawRow) -> Option<TransactionCandidate> {
    let date = parse_date(row)?;
    let magnitude = parse_required_amount(row, AMOUNT_KEYS)?.abs();
    let type_text = cell_text(row, TYPE_KEYS)?.to_lowercase();

    let inflow = CREDIT_WORDS.iter().any(|w| type_text.contains(w));
    let amount = if inflow { magnitude } else { -magnitude };

    let raw_desc = cell_text(row, DESCRIPTION_KEYS).unwrap_or_default();
    Some(build(row, date, amount, &raw_desc, TxnStatus::Completed))
}

/// Bank ledger export: a withdrawal/deposit pair plus date. Exactly one
/// side must be non-zero; rows with both sides zero or both non-zero are
/// ambiguous and dropped.
fn map_bank(row: &RawRow) -> Option<TransactionCandidate> {
    let date = parse_date(row)?;
    let withdrawal = amount::parse_cell_or_zero(row.first_of(WITHDRAWAL_KEYS))?.abs();
    let deposit = amount::parse_cell_or_zero(row.first_of(DEPOSIT_KEYS))?.abs();

    let amount = match (withdrawal.is_zero(), deposit.is_zero()) {
        (true, false) => deposit,
        (false, true) => -withdrawal,
        _ => return None,
    };

    let raw_desc = cell_text(row, DESCRIPTION_KEYS).unwrap_or_default();
    Some(build(row, date, amount, &raw_desc, TxnStatus::Completed))
}

/// Anything with an amount and a date. Sign comes from an explicit type
/// column when one exists; without one the row defaults to an expense —
/// statement exports that omit a type column are overwhelmingly spend-side.
fn map_generic(row: &RawRow) -> Option<TransactionCandidate> {
    let date = parse_date(row)?;
    let parsed = parse_required_amount(row, AMOUNT_KEYS)?;
    let magnitude = parsed.abs();

    let inflow = cell_text(row, TYPE_KEYS)
        .map(|t| {
            let t = t.to_lowercase();
            ["income", "credit", "deposit", "cr"]
                .iter()
                .any(|w| t.contains(w))
        })
        .unwrap_or(false);
    let amount = if inflow { magnitude } else { -magnitude };

    let raw_desc = cell_text(row, DESCRIPTION_KEYS).unwrap_or_default();
    Some(build(row, date, amount, &raw_desc, TxnStatus::Completed))
}
