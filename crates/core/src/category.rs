use regex::Regex;
use std::sync::OnceLock;

/// Category returned when no rule matches.
pub const DEFAULT_CATEGORY: &str = "Misc";

/// One ordered rule: a category, keyword substrings, and an optional regex
/// for patterns keywords cannot express. Evaluation is first-match-wins,
/// so rule order is part of the contract: "salary credited" is Income even
/// though "credited" alone means nothing.
struct Rule {
    category: &'static str,
    keywords: &'static [&'static str],
    pattern: Option<&'static str>,
}

const RULES: &[Rule] = &[
    Rule {
        category: "Income",
        keywords: &["salary", "payroll", "stipend", "dividend", "cashback", "refund"],
        pattern: Some(r"\binterest (credit|earned|paid)\b"),
    },
    Rule {
        category: "Subscriptions",
        keywords: &[
            "netflix", "spotify", "prime video", "youtube premium", "hotstar",
            "icloud", "google one", "subscription", "membership",
        ],
        pattern: None,
    },
    Rule {
        category: "Food & Dining",
        keywords: &[
            "swiggy", "zomato", "restaurant", "cafe", "pizza", "burger",
            "mcdonald", "kfc", "domino", "starbucks", "eatery", "biryani",
        ],
        pattern: None,
    },
    Rule {
        category: "Groceries",
        keywords: &[
            "blinkit", "zepto", "bigbasket", "instamart", "grofers", "grocery",
            "supermarket", "dmart", "kirana",
        ],
        pattern: None,
    },
    Rule {
        category: "Shopping",
        keywords: &["amazon", "flipkart", "myntra", "ajio", "mall", "store", "retail"],
        pattern: None,
    },
    Rule {
        category: "Transport",
        keywords: &[
            "uber", "ola", "rapido", "irctc", "metro", "fuel", "petrol",
            "diesel", "parking", "toll",
        ],
        pattern: None,
    },
    Rule {
        category: "Utilities",
        keywords: &[
            "electricity", "water bill", "gas bill", "broadband", "recharge",
            "jio", "airtel", "vodafone", "postpaid", "prepaid",
        ],
        pattern: None,
    },
    Rule {
        category: "Healthcare",
        keywords: &["pharmacy", "hospital", "clinic", "apollo", "medplus", "diagnostic", "medical"],
        pattern: None,
    },
    Rule {
        category: "Education",
        keywords: &["tuition", "school", "college", "course", "udemy", "coursera", "exam fee"],
        pattern: None,
    },
    Rule {
        category: "Entertainment",
        keywords: &["bookmyshow", "pvr", "inox", "movie", "concert", "gaming", "steam"],
        pattern: None,
    },
    Rule {
        category: "Finance",
        keywords: &["emi", "loan", "insurance", "mutual fund", "sip", "brokerage", "premium"],
        pattern: None,
    },
];

struct CompiledRule {
    category: &'static str,
    keywords: &'static [&'static str],
    pattern: Option<Regex>,
}

/// Keyword/regex categorizer over cleaned descriptions. Rules are compiled
/// once and evaluated in fixed order; ties cannot happen because the first
/// match wins.
pub struct HeuristicCategorizer {
    rules: Vec<CompiledRule>,
}

impl HeuristicCategorizer {
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .map(|r| CompiledRule {
                category: r.category,
                keywords: r.keywords,
                pattern: r.pattern.and_then(|p| Regex::new(p).ok()),
            })
            .collect();
        Self { rules }
    }

    pub fn categorize(&self, description: &str) -> &'static str {
        let text = description.to_lowercase();
        self.rules
            .iter()
            .find(|r| {
                r.keywords.iter().any(|k| text.contains(k))
                    || r.pattern.as_ref().is_some_and(|re| re.is_match(&text))
            })
            .map(|r| r.category)
            .unwrap_or(DEFAULT_CATEGORY)
    }
}

impl Default for HeuristicCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Categorize against a shared compiled instance.
pub fn categorize(description: &str) -> &'static str {
    static ENGINE: OnceLock<HeuristicCategorizer> = OnceLock::new();
    ENGINE.get_or_init(HeuristicCategorizer::new).categorize(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert_eq!(categorize("SWIGGY ORDER"), "Food & Dining");
        assert_eq!(categorize("Netflix Monthly"), "Subscriptions");
    }

    #[test]
    fn first_rule_wins_on_overlap() {
        // "refund" (Income) appears before any shopping keyword can match.
        assert_eq!(categorize("Amazon refund"), "Income");
    }

    #[test]
    fn regex_rule_matches() {
        assert_eq!(categorize("interest credit for Q3"), "Income");
        assert_eq!(categorize("point of interest"), "Misc");
    }

    #[test]
    fn each_category_is_reachable() {
        let cases = [
            ("salary for march", "Income"),
            ("spotify", "Subscriptions"),
            ("dominos pizza", "Food & Dining"),
            ("bigbasket order", "Groceries"),
            ("flipkart", "Shopping"),
            ("uber trip", "Transport"),
            ("jio recharge", "Utilities"),
            ("apollo pharmacy", "Healthcare"),
            ("coursera annual", "Education"),
            ("pvr tickets", "Entertainment"),
            ("home loan emi", "Finance"),
        ];
        for (desc, want) in cases {
            assert_eq!(categorize(desc), want, "{desc}");
        }
    }

    #[test]
    fn unknown_descriptions_default_to_misc() {
        assert_eq!(categorize("Gaurav Kumar"), DEFAULT_CATEGORY);
        assert_eq!(categorize(""), DEFAULT_CATEGORY);
    }
}
