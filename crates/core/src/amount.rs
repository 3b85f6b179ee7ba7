use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::value::CellValue;

/// Parse an amount cell into a decimal.
///
/// Strips currency symbols and alphabetic currency prefixes (`₹1,234.50`,
/// `INR 299.00`), whitespace, and thousands separators. Accounting
/// parentheses are treated as noise around the magnitude: whether the row
/// is a debit or a credit is the dialect mapper's decision, not the amount
/// parser's. Empty or non-numeric input is a failure, never zero.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    static CURRENCY_PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = CURRENCY_PREFIX
        .get_or_init(|| Regex::new(r"^[A-Za-z₹$€£¥]+\s*").expect("valid regex"));

    let mut s = input.trim().to_string();
    if s.is_empty() {
        return None;
    }

    // Wrapped parens denote magnitude only.
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        s = s[1..s.len() - 1].trim().to_string();
    }

    // A leading sign survives the prefix strip.
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (Decimal::NEGATIVE_ONE, rest.trim_start()),
        None => (Decimal::ONE, s.strip_prefix('+').unwrap_or(&s).trim_start()),
    };

    let rest = prefix.replace(rest, "");
    let cleaned: String = rest
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && !"₹$€£¥".contains(*c))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok().map(|d| sign * d)
}

/// Amount from a typed cell: numbers pass through, text goes through
/// [`parse_amount`], empty cells fail.
pub fn parse_cell(cell: &CellValue) -> Option<Decimal> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => parse_amount(s),
        CellValue::Empty => None,
    }
}

/// Amount from an optional cell where absence means zero: the bank-dialect
/// withdrawal/deposit pair uses this, since those columns are legitimately
/// blank on the opposite side of each row.
pub fn parse_cell_or_zero(cell: Option<&CellValue>) -> Option<Decimal> {
    match cell {
        None => Some(Decimal::ZERO),
        Some(c) if c.is_blank() => Some(Decimal::ZERO),
        Some(c) => parse_cell(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn plain_decimal() {
        assert_eq!(parse_amount("123.45"), Some(dec("123.45")));
        assert_eq!(parse_amount("0.01"), Some(dec("0.01")));
    }

    #[test]
    fn rupee_symbol_and_thousands_separators() {
        assert_eq!(parse_amount("₹1,234.50"), Some(dec("1234.50")));
        assert_eq!(parse_amount("$ 2,500"), Some(dec("2500")));
    }

    #[test]
    fn alphabetic_currency_prefix() {
        assert_eq!(parse_amount("INR 299.00"), Some(dec("299.00")));
        assert_eq!(parse_amount("USD 50"), Some(dec("50")));
    }

    #[test]
    fn parens_denote_magnitude_not_sign() {
        assert_eq!(parse_amount("(500)"), Some(dec("500")));
        assert_eq!(parse_amount("(₹1,000.25)"), Some(dec("1000.25")));
    }

    #[test]
    fn explicit_minus_is_preserved() {
        assert_eq!(parse_amount("-42.00"), Some(dec("-42.00")));
        assert_eq!(parse_amount("-₹99"), Some(dec("-99")));
    }

    #[test]
    fn empty_and_garbage_fail_rather_than_coerce_to_zero() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("₹"), None);
    }

    #[test]
    fn cell_variants() {
        assert_eq!(
            parse_cell(&CellValue::Number(dec("12.34"))),
            Some(dec("12.34"))
        );
        assert_eq!(
            parse_cell(&CellValue::Text("₹12.34".into())),
            Some(dec("12.34"))
        );
        assert_eq!(parse_cell(&CellValue::Empty), None);
    }

    #[test]
    fn missing_cell_is_zero_only_in_pair_context() {
        assert_eq!(parse_cell_or_zero(None), Some(Decimal::ZERO));
        assert_eq!(
            parse_cell_or_zero(Some(&CellValue::Empty)),
            Some(Decimal::ZERO)
        );
        assert_eq!(
            parse_cell_or_zero(Some(&CellValue::Text("bad".into()))),
            None
        );
    }
}
