//! Recommendation policy keyed by a learner's self-described primary struggle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub journey_ids: Vec<String>,
    pub article_ids: Vec<String>,
    pub therapist_specialties: Vec<String>,
}

/// Maps a primary struggle to suggested content. Swappable without touching
/// the progression engine.
pub trait RecommendationPolicy: Send + Sync {
    fn recommend(&self, primary_struggle: &str) -> Recommendation;
}

/// Fixed lookup table with a fallback entry for unknown struggles.
/// Keys are matched case-insensitively after trimming.
#[derive(Debug, Clone, Default)]
pub struct StaticRecommendationTable {
    entries: HashMap<String, Recommendation>,
    fallback: Recommendation,
}

impl StaticRecommendationTable {
    pub fn new(fallback: Recommendation) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    pub fn with_entry(mut self, struggle: &str, recommendation: Recommendation) -> Self {
        self.entries.insert(normalize(struggle), recommendation);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Table matching the built-in journey catalog.
    pub fn seeded() -> Self {
        Self::new(rec(
            &["anxiety-toolkit"],
            &["understanding-anxiety"],
            &["general counseling"],
        ))
        .with_entry(
            "anxiety",
            rec(
                &["anxiety-toolkit"],
                &["understanding-anxiety", "grounding-techniques"],
                &["anxiety disorders", "cbt"],
            ),
        )
        .with_entry(
            "sleep",
            rec(
                &["sleep-reset"],
                &["sleep-hygiene"],
                &["insomnia", "cbt-i"],
            ),
        )
        .with_entry(
            "depression",
            rec(
                &["self-compassion"],
                &["behavioral-activation"],
                &["depression", "mood disorders"],
            ),
        )
        .with_entry(
            "stress",
            rec(
                &["anxiety-toolkit", "sleep-reset"],
                &["stress-response"],
                &["stress management"],
            ),
        )
    }
}

impl RecommendationPolicy for StaticRecommendationTable {
    fn recommend(&self, primary_struggle: &str) -> Recommendation {
        self.entries
            .get(&normalize(primary_struggle))
            .unwrap_or(&self.fallback)
            .clone()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

fn rec(journeys: &[&str], articles: &[&str], specialties: &[&str]) -> Recommendation {
    let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
    Recommendation {
        journey_ids: owned(journeys),
        article_ids: owned(articles),
        therapist_specialties: owned(specialties),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let table = StaticRecommendationTable::seeded();
        let rec = table.recommend("  Sleep ");
        assert_eq!(rec.journey_ids, vec!["sleep-reset".to_string()]);
        assert!(rec.therapist_specialties.contains(&"insomnia".to_string()));
    }

    #[test]
    fn test_unknown_struggle_uses_fallback() {
        let table = StaticRecommendationTable::seeded();
        assert_eq!(table.recommend("loneliness").journey_ids, vec!["anxiety-toolkit".to_string()]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_custom_table() {
        let table = StaticRecommendationTable::new(Recommendation::default())
            .with_entry("grief", rec(&["grief-path"], &[], &["bereavement"]));
        assert_eq!(table.recommend("GRIEF").journey_ids, vec!["grief-path".to_string()]);
        assert!(table.recommend("other").journey_ids.is_empty());
    }
}
