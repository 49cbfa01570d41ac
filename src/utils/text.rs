use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").expect("valid sentence regex"));
static FIRST_SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^.!?]+[.!?]").expect("valid first sentence regex"));

pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Splits on terminal punctuation, keeping the punctuation with its sentence.
/// Empty fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| normalize_whitespace(m.as_str()))
        .filter(|sentence| !sentence.is_empty() && sentence.chars().any(|ch| ch.is_alphanumeric()))
        .collect()
}

pub fn first_sentence(text: &str) -> Option<String> {
    FIRST_SENTENCE_RE
        .find(text.trim_start())
        .map(|m| m.as_str().trim().to_string())
}

pub fn ensure_terminal_period(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lowered = haystack.to_lowercase();
    needles.iter().any(|needle| lowered.contains(needle))
}

pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sentences_and_keeps_trailing_fragment() {
        let sentences = split_sentences("Soft cotton twill.  Front placket!  Back yoke");
        assert_eq!(sentences, vec!["Soft cotton twill.", "Front placket!", "Back yoke"]);
    }

    #[test]
    fn first_sentence_requires_terminal_punctuation() {
        assert_eq!(
            first_sentence("Relaxed fit through the thigh. Tapered leg."),
            Some("Relaxed fit through the thigh.".to_string())
        );
        assert_eq!(first_sentence("no punctuation here"), None);
    }

    #[test]
    fn ensures_period_only_when_missing() {
        assert_eq!(ensure_terminal_period(" Hands in pockets "), "Hands in pockets.");
        assert_eq!(ensure_terminal_period("Done!"), "Done!");
        assert_eq!(ensure_terminal_period("   "), "");
    }

    #[test]
    fn truncates_long_values_for_logs() {
        assert_eq!(truncate_for_log("abcdef", 3), "abc... (truncated)");
        assert_eq!(truncate_for_log("abc", 3), "abc");
    }
}
