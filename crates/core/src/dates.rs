use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// A single pure parse attempt. Returns `None` rather than an error so the
/// chain can move on to the next form.
type ParseAttempt = fn(&str) -> Option<NaiveDateTime>;

/// Fixed trial order. First success wins; the order matters because the
/// day-first slash/dash forms are ambiguous against US month-first dates.
const ATTEMPTS: &[ParseAttempt] = &[
    parse_slash,
    parse_dash,
    parse_verbose,
    parse_fallback,
];

/// Parse a statement date/time cell into an instant.
///
/// Tries, in order: day-first slash (`15/3/2024 10:30`), day-first dash,
/// the verbose export form (`15 Sept 2024, 10:30`), then a lenient ISO
/// fallback. Date-only forms resolve to midnight. All forms failing means
/// the row is unusable and is dropped upstream.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    ATTEMPTS.iter().find_map(|attempt| attempt(s))
}

fn try_formats(s: &str, with_time: &[&str], date_only: &[&str]) -> Option<NaiveDateTime> {
    for fmt in with_time {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in date_only {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// `D/M/YY[YY]` with an optional ` h:mm[:ss]` suffix.
fn parse_slash(s: &str) -> Option<NaiveDateTime> {
    try_formats(
        s,
        &[
            "%d/%m/%Y %H:%M:%S",
            "%d/%m/%Y %H:%M",
            "%d/%m/%y %H:%M:%S",
            "%d/%m/%y %H:%M",
        ],
        &["%d/%m/%Y", "%d/%m/%y"],
    )
}

/// `D-M-YY[YY]` with an optional ` h:mm[:ss]` suffix.
fn parse_dash(s: &str) -> Option<NaiveDateTime> {
    try_formats(
        s,
        &[
            "%d-%m-%Y %H:%M:%S",
            "%d-%m-%Y %H:%M",
            "%d-%m-%y %H:%M:%S",
            "%d-%m-%y %H:%M",
        ],
        &["%d-%m-%Y", "%d-%m-%y"],
    )
}

/// `D Month YYYY, h:mm[:ss]` — the form wallet exports use.
fn parse_verbose(s: &str) -> Option<NaiveDateTime> {
    let s = fix_month_typo(s);
    try_formats(
        &s,
        &[
            "%d %b %Y, %H:%M:%S",
            "%d %b %Y, %H:%M",
            "%d %B %Y, %H:%M:%S",
            "%d %B %Y, %H:%M",
        ],
        &["%d %b %Y", "%d %B %Y"],
    )
}

/// Last resort: ISO 8601 variants.
fn parse_fallback(s: &str) -> Option<NaiveDateTime> {
    let s = fix_month_typo(s);
    try_formats(
        &s,
        &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"],
        &["%Y-%m-%d", "%Y/%m/%d"],
    )
}

/// Some exports abbreviate September as "Sept", which no strftime form
/// accepts. Rewrite the standalone token only — "September" must survive.
fn fix_month_typo(s: &str) -> Cow<'_, str> {
    static SEPT: OnceLock<Regex> = OnceLock::new();
    let re = SEPT.get_or_init(|| Regex::new(r"\b[Ss]ept\b").expect("valid regex"));
    re.replace(s, "Sep")
}
