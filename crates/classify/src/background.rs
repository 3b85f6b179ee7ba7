use std::collections::HashMap;
use std::time::Duration;

use crate::canonical::group_by_canonical;
use crate::client::Classifier;

/// Best-effort ML categorization that never blocks or fails an import.
///
/// Descriptions are grouped by canonical form so the service is asked
/// about each distinct shape once; the external call races a timer, and
/// whichever settles first wins — the losing future is dropped, never
/// awaited. Any failure degrades to an empty map, leaving the caller on
/// the heuristic categorizer.
pub struct BackgroundClassifier<C> {
    classifier: C,
    timeout: Duration,
}

impl<C: Classifier> BackgroundClassifier<C> {
    pub fn new(classifier: C, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    /// Map each input description to a category, where the service knows
    /// one. Missing keys mean "fall back to the heuristic".
    pub async fn classify(&self, descriptions: &[String]) -> HashMap<String, String> {
        if descriptions.is_empty() {
            return HashMap::new();
        }

        let groups = group_by_canonical(descriptions.iter().map(String::as_str));
        let canonical: Vec<String> = groups.keys().cloned().collect();

        let by_canonical = tokio::select! {
            result = self.classifier.classify(&canonical) => match result {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(error = %e, "classification failed, using heuristics");
                    return HashMap::new();
                }
            },
            _ = tokio::time::sleep(self.timeout) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "classification timed out, using heuristics"
                );
                return HashMap::new();
            }
        };

        // Expand the canonical answers back to every original description.
        let mut out = HashMap::new();
        for (canonical_form, originals) in groups {
            if let Some(category) = by_canonical.get(&canonical_form) {
                for original in originals {
                    out.insert(original, category.clone());
                }
            }
        }
        out
    }
}
