use std::collections::BTreeSet;

use super::reference::TriageReferenceData;
use super::types::ConditionCategory;

/// Outcome of keyword matching.
#[derive(Debug, Clone, Copy)]
pub struct CategoryMatch<'a> {
    pub category: &'a ConditionCategory,
    /// The keyword that selected the category, `None` for the fallback.
    pub keyword: Option<&'a str>,
}

impl CategoryMatch<'_> {
    pub fn is_fallback(&self) -> bool {
        self.keyword.is_none()
    }
}

/// Map tokens to a category.
///
/// Keyword bindings are evaluated top-to-bottom in registry order and the
/// first one that matches wins. Category keywords match as substrings of the
/// rejoined text, synonyms only as whole tokens. No match resolves to the
/// fallback category; this never fails.
pub fn match_category<'a>(tokens: &[String], reference: &'a TriageReferenceData) -> CategoryMatch<'a> {
    let text = tokens.join(" ");

    if let Some(binding) = reference
        .keyword_bindings()
        .find(|b| b.matches(&text, tokens))
    {
        return CategoryMatch {
            category: binding.category,
            keyword: Some(binding.keyword),
        };
    }

    CategoryMatch {
        category: reference.fallback_category(),
        keyword: None,
    }
}

/// Every registry keyword present in the text, across all categories.
pub fn recognized_keywords(tokens: &[String], reference: &TriageReferenceData) -> BTreeSet<String> {
    let text = tokens.join(" ");
    reference
        .keyword_bindings()
        .filter(|b| b.matches(&text, tokens))
        .map(|b| b.keyword.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::normalizer::tokenize;
    use crate::triage::types::UrgencyLevel;

    fn matched(text: &str) -> String {
        let reference = TriageReferenceData::builtin();
        let tokens = tokenize(&text.to_lowercase());
        match_category(&tokens, &reference).category.key.clone()
    }

    #[test]
    fn chest_maps_to_chest_with_immediate_urgency() {
        let reference = TriageReferenceData::builtin();
        for text in ["chest pain", "tightness in my chest", "pressure on the CHEST at night"] {
            let tokens = tokenize(&text.to_lowercase());
            let m = match_category(&tokens, &reference);
            assert_eq!(m.category.key, "chest", "text: {text}");
            assert_eq!(m.category.base_urgency, UrgencyLevel::Immediate);
            assert_eq!(m.keyword, Some("chest"));
        }
    }

    #[test]
    fn no_keyword_returns_fallback() {
        let reference = TriageReferenceData::builtin();
        for text in ["just a general checkup", "feeling tired", "", "stomach ache"] {
            let tokens = tokenize(text);
            let m = match_category(&tokens, &reference);
            assert_eq!(m.category.key, "fever", "text: {text}");
            assert!(m.is_fallback());
        }
    }

    #[test]
    fn fallback_is_deterministic() {
        let first = matched("nothing recognizable here");
        for _ in 0..10 {
            assert_eq!(matched("nothing recognizable here"), first);
        }
    }

    #[test]
    fn collision_resolved_by_declaration_order() {
        // headache is declared before fever
        assert_eq!(matched("fever and a headache"), "headache");
        assert_eq!(matched("headache with fever"), "headache");
        // skin is declared before chest
        assert_eq!(matched("rash across my chest"), "skin");
    }

    #[test]
    fn keyword_fever_is_not_fallback() {
        let reference = TriageReferenceData::builtin();
        let tokens = tokenize("high fever");
        let m = match_category(&tokens, &reference);
        assert_eq!(m.category.key, "fever");
        assert!(!m.is_fallback());
    }

    #[test]
    fn substring_matching_inside_words() {
        assert_eq!(matched("my eyes are red"), "eye");
        assert_eq!(matched("itchy arms"), "skin");
    }

    #[test]
    fn synonyms_do_not_fire_inside_other_words() {
        assert_eq!(matched("chest pain while cooking in the kitchen"), "chest");
        assert_eq!(matched("chest pain after I switched medication"), "chest");
        assert_eq!(matched("sharp stitch in my chest"), "chest");
        assert_eq!(matched("chest pain since watching television"), "chest");
        // "heartburn" is not "heart"
        assert_eq!(matched("bad heartburn"), "fever");
    }

    #[test]
    fn synonyms_match_as_whole_words() {
        assert_eq!(matched("my heart is racing"), "chest");
        assert_eq!(matched("blurry vision"), "eye");
        assert_eq!(matched("another migraine"), "headache");
    }

    #[test]
    fn recognized_keywords_collects_all_categories() {
        let reference = TriageReferenceData::builtin();
        let tokens = tokenize("fever and headache and a rash");
        let found = recognized_keywords(&tokens, &reference);
        let found: Vec<&str> = found.iter().map(String::as_str).collect();
        assert_eq!(found, vec!["fever", "headache", "rash"]);
    }
}
