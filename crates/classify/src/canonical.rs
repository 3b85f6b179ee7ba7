use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Placeholder substituted for numeric order/reference ids.
const ID_PLACEHOLDER: &str = "#";

fn id_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Three digits or more: order numbers and references, not quantities
    // like "7 eleven".
    RE.get_or_init(|| Regex::new(r"\d{3,}").expect("valid regex"))
}

fn spaces() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Reduce a description to its canonical form: order ids collapsed to a
/// placeholder, whitespace normalized, case folded. `SWIGGY ORDER #12345`
/// and `SWIGGY ORDER #67890` canonicalize identically, so the classifier
/// is asked about that shape exactly once.
pub fn canonical_form(description: &str) -> String {
    let replaced = id_run().replace_all(description, ID_PLACEHOLDER);
    let collapsed = spaces().replace_all(replaced.trim(), " ");
    collapsed.to_uppercase()
}

/// Group descriptions by canonical form, preserving first-seen order of
/// the originals within each group. The key set is what actually goes to
/// the classifier; the groups expand its answer back out.
pub fn group_by_canonical<'a, I>(descriptions: I) -> HashMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    for description in descriptions {
        groups
            .entry(canonical_form(description))
            .or_default()
            .push(description.to_string());
    }
    groups
}
