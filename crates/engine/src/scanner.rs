use once_cell::sync::Lazy;
use regex::Regex;

/// The fixed safety vocabulary, in canonical (lowercase) casing.
pub const KEYWORDS: &[&str] = &[
    "risk", "urgent", "warning", "must", "need", "should", "careful", "sad", "thin", "hate",
    "unsafe",
];

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| compile_pattern(KEYWORDS));

fn compile_pattern(vocabulary: &[&str]) -> Regex {
    let alternation = vocabulary
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    #[allow(clippy::expect_used)]
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("vocabulary pattern is valid")
}

/// Pure matcher for the fixed vocabulary: text in, ordered matches out.
#[derive(Debug, Clone)]
pub struct KeywordScanner {
    pattern: Regex,
}

impl KeywordScanner {
    /// Scanner over the default safety vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }

    /// Scanner over a custom whole-word vocabulary. Terms are matched
    /// case-insensitively; casing of the vocabulary itself is irrelevant.
    #[must_use]
    pub fn with_vocabulary(vocabulary: &[&str]) -> Self {
        Self {
            pattern: compile_pattern(vocabulary),
        }
    }

    /// Every distinct vocabulary term occurring as a whole word in `text`,
    /// in order of first occurrence. Each match is returned as the substring
    /// actually found (display casing); uniqueness is judged on the
    /// lowercased form. Empty input yields an empty vec. Never fails.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut seen: Vec<String> = Vec::new();
        let mut matches = Vec::new();
        for captures in self.pattern.captures_iter(text) {
            let Some(found) = captures.get(1) else {
                continue;
            };
            let normalized = found.as_str().to_lowercase();
            if seen.contains(&normalized) {
                continue;
            }
            seen.push(normalized);
            matches.push(found.as_str().to_string());
        }
        matches
    }
}

impl Default for KeywordScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::KeywordScanner;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_keywords_in_first_occurrence_order() {
        let scanner = KeywordScanner::new();
        assert_eq!(
            scanner.scan("I hate this, it's unsafe"),
            vec!["hate".to_string(), "unsafe".to_string()]
        );
    }

    #[test]
    fn repeated_word_reported_once() {
        let scanner = KeywordScanner::new();
        assert_eq!(
            scanner.scan("risk, RISK! (risk) risk."),
            vec!["risk".to_string()]
        );
    }

    #[test]
    fn case_insensitive_match_keeps_display_casing() {
        let scanner = KeywordScanner::new();
        assert_eq!(scanner.scan("URGENT update"), vec!["URGENT".to_string()]);
    }

    #[test]
    fn whole_word_boundaries_respected() {
        let scanner = KeywordScanner::new();
        // "hateful" must not match the "hate" term.
        assert_eq!(scanner.scan("hateful comments"), Vec::<String>::new());
        assert_eq!(scanner.scan("so sad."), vec!["sad".to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let scanner = KeywordScanner::new();
        assert_eq!(scanner.scan(""), Vec::<String>::new());
    }

    #[test]
    fn custom_vocabulary_is_honored() {
        let scanner = KeywordScanner::with_vocabulary(&["alert"]);
        assert_eq!(scanner.scan("red ALERT now"), vec!["ALERT".to_string()]);
        assert_eq!(scanner.scan("risk everywhere"), Vec::<String>::new());
    }
}
