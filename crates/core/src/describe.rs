use regex::Regex;
use std::sync::OnceLock;

use crate::candidate::PaymentRail;

/// Display cap for cleaned descriptions; longer text is cut with an ellipsis.
const MAX_DESCRIPTION_LEN: usize = 40;

/// Label used when nothing human-readable survives cleanup.
const FALLBACK_LABEL: &str = "Transaction";

/// Transfer-rail acronyms and bookkeeping tokens that carry no merchant
/// information. Compared against lowercased whole tokens.
const NOISE_TOKENS: &[&str] = &[
    "upi", "neft", "imps", "rtgs", "pos", "atm", "inb", "ib", "mb", "ach",
    "tfr", "wdl", "dep", "dr", "cr", "ref", "rev", "txn", "pmt",
];

/// Bank names that show up as counterparty-bank segments in UPI narrations.
const BANK_NAMES: &[&str] = &[
    "hdfc", "icici", "sbi", "axis", "kotak", "yesbank", "idfc", "indusind",
    "pnb", "canara", "barb", "ubin", "paytmbank", "airtelbank",
];

/// Known merchants, checked before any heuristic cleanup. Order matters:
/// more specific aliases come first so "swiggy instamart" does not collapse
/// into plain Swiggy.
const KNOWN_MERCHANTS: &[(&str, &[&str])] = &[
    ("Swiggy Instamart", &["swiggy instamart", "instamart"]),
    ("Swiggy", &["swiggy"]),
    ("Zomato", &["zomato"]),
    ("Uber", &["uber"]),
    ("Ola", &["olacabs", "ola cabs", "ola money"]),
    ("Rapido", &["rapido"]),
    ("Blinkit", &["blinkit", "grofers"]),
    ("Zepto", &["zepto"]),
    ("BigBasket", &["bigbasket", "big basket"]),
    ("Amazon", &["amazon", "amzn"]),
    ("Flipkart", &["flipkart"]),
    ("Myntra", &["myntra"]),
    ("Netflix", &["netflix"]),
    ("Spotify", &["spotify"]),
    ("YouTube", &["youtube"]),
    ("Apple", &["apple.com", "itunes"]),
    ("Jio", &["reliance jio", "jio "]),
    ("Airtel", &["airtel"]),
    ("IRCTC", &["irctc"]),
    ("McDonald's", &["mcdonalds", "mcdonald"]),
    ("Starbucks", &["starbucks"]),
    ("KFC", &["kfc"]),
    ("Domino's", &["dominos", "domino's"]),
];

fn rail_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(upi|neft|imps|pos|atm|inb|cash)\b").expect("valid regex")
    })
}

fn counterparty_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // UPI/123456789012/GAURAV KUMAR/HDFC/... and NEFT-AXIS-000123-NAME forms.
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:upi|neft|imps|rtgs)[/\-]\w*[/\-]?\d+[/\-]([^/\-|>]+)")
            .expect("valid regex")
    })
}

/// Detect the payment rail named in a raw narration, if any.
pub fn detect_rail(raw: &str) -> Option<PaymentRail> {
    let m = rail_pattern().find(raw)?;
    match m.as_str().to_ascii_lowercase().as_str() {
        "upi" => Some(PaymentRail::Upi),
        "neft" => Some(PaymentRail::Neft),
        "imps" => Some(PaymentRail::Imps),
        "pos" => Some(PaymentRail::Pos),
        "atm" => Some(PaymentRail::Atm),
        "inb" => Some(PaymentRail::Netbanking),
        "cash" => Some(PaymentRail::Cash),
        _ => None,
    }
}

/// True for reference codes: digit runs and alphanumeric blobs that mix
/// letters and digits without being a word.
fn is_reference_code(token: &str) -> bool {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let alnum = token.chars().all(|c| c.is_ascii_alphanumeric());
    has_digit && alnum
}

fn is_noise_token(token: &str) -> bool {
    let t = token.to_ascii_lowercase();
    NOISE_TOKENS.contains(&t.as_str()) || BANK_NAMES.contains(&t.as_str()) || is_reference_code(token)
}

/// A segment is human-readable once its noise tokens are removed and at
/// least one alphabetic word remains.
fn readable_words(segment: &str) -> Vec<&str> {
    segment
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .filter(|w| !is_noise_token(w))
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .collect()
}

fn title_case(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| {
            let lower = w.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_with_ellipsis(s: String) -> String {
    if s.chars().count() <= MAX_DESCRIPTION_LEN {
        return s;
    }
    let cut: String = s.chars().take(MAX_DESCRIPTION_LEN).collect();
    format!("{}…", cut.trim_end())
}

/// Clean a raw narration into a short human-readable description.
///
/// Splits on the separators banks use (`/`, `|`, `>`), discards noise
/// tokens (rail acronyms, bank names, reference codes), keeps the first
/// segment that still reads like words, title-cases and truncates it.
pub fn clean_description(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return FALLBACK_LABEL.to_string();
    }

    for segment in raw.split(['/', '|', '>']) {
        let words = readable_words(segment);
        if !words.is_empty() {
            return truncate_with_ellipsis(title_case(&words));
        }
    }

    FALLBACK_LABEL.to_string()
}

/// Extract a merchant name from a raw narration.
///
/// Tries the known-merchant alias table first, then the UPI/NEFT
/// counterparty position, then falls back to the cleaned description.
pub fn merchant_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    for (official, aliases) in KNOWN_MERCHANTS {
        if aliases.iter().any(|a| lowered.contains(a)) {
            return (*official).to_string();
        }
    }

    if let Some(cap) = counterparty_pattern().captures(raw) {
        let words = readable_words(&cap[1]);
        if !words.is_empty() {
            return title_case(&words);
        }
    }

    clean_description(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_drops_rail_prefix() {
        assert_eq!(
            clean_description("UPI/402912345678/CHAIPOINT BANGALORE/HDFC"),
            "Chaipoint Bangalore"
        );
    }

    #[test]
    fn drops_reference_codes_and_bank_names() {
        assert_eq!(
            clean_description("NEFT-AXIS-N0123456789-ACME CONSULTING LLP"),
            "Acme Consulting Llp"
        );
    }

    #[test]
    fn title_cases_plain_descriptions() {
        assert_eq!(clean_description("MONTHLY RENT PAYMENT"), "Monthly Rent Payment");
    }

    #[test]
    fn fallback_when_nothing_readable_remains() {
        assert_eq!(clean_description("UPI/912345678901/123456"), "Transaction");
        assert_eq!(clean_description(""), "Transaction");
        assert_eq!(clean_description("0012345678"), "Transaction");
    }

    #[test]
    fn long_descriptions_are_truncated_with_ellipsis() {
        let raw = "SOME EXTREMELY LONG MERCHANT NARRATION THAT KEEPS GOING AND GOING";
        let cleaned = clean_description(raw);
        assert!(cleaned.ends_with('…'));
        assert!(cleaned.chars().count() <= MAX_DESCRIPTION_LEN + 1);
    }

    #[test]
    fn known_merchant_alias_wins() {
        assert_eq!(merchant_name("POS 1234 SWIGGY INSTAMART BLR"), "Swiggy Instamart");
        assert_eq!(merchant_name("UPI/912345/ZOMATO LTD/ICICI"), "Zomato");
    }

    #[test]
    fn upi_counterparty_position_is_used() {
        assert_eq!(
            merchant_name("UPI/DR/402912345678/GAURAV KUMAR/SBIN/**1234"),
            "Gaurav Kumar"
        );
    }

    #[test]
    fn rail_detection() {
        assert_eq!(detect_rail("UPI/1234/NAME"), Some(PaymentRail::Upi));
        assert_eq!(detect_rail("ATM WDL 000123 MG ROAD"), Some(PaymentRail::Atm));
        assert_eq!(detect_rail("NEFT-HDFC-0001-ACME"), Some(PaymentRail::Neft));
        assert_eq!(detect_rail("CARD PURCHASE"), None);
    }

    #[test]
    fn reference_code_detection() {
        assert!(is_reference_code("402912345678"));
        assert!(is_reference_code("TXN0012AB"));
        assert!(!is_reference_code("BANGALORE"));
        assert!(!is_reference_code("chai-point"));
    }
}
