//! Heuristic clean-up of analysis text. Only runs when the caller did not
//! supply an override document.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::request::WorkflowType;
use crate::compiler::structured::StructuredPrompt;
use crate::utils::text::{contains_any, normalize_whitespace, split_sentences};

const DENIM_NAME_KEYWORDS: &[&str] = &["denim", "jean", "kot"];
const FRONT_KEYWORDS: &[&str] = &["front", "chest"];
const BACK_KEYWORDS: &[&str] = &["back", "rear"];
const MIN_FABRIC_CHARS: usize = 6;

static TWILL_CANVAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:cotton\s+)?(?:twill|canvas)\b").expect("valid twill regex")
});
static LABELLED_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:texture|pattern|color|colour)\s*:\s*(?:undefined|null)\.?")
        .expect("valid labelled token regex")
});
static BARE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:undefined|null)\b").expect("valid bare token regex"));
static ORPHAN_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,;:])").expect("valid punctuation regex"));

pub fn strip_placeholder_tokens(text: &str) -> Option<String> {
    let without_labels = LABELLED_TOKEN_RE.replace_all(text, "");
    let without_tokens = BARE_TOKEN_RE.replace_all(&without_labels, "");
    let tidy = ORPHAN_PUNCT_RE.replace_all(&without_tokens, "$1");
    let cleaned = normalize_whitespace(&tidy);
    if cleaned.chars().count() < MIN_FABRIC_CHARS {
        None
    } else {
        Some(cleaned)
    }
}

/// Analysis models often read raw denim as twill or canvas.
pub fn correct_denim(product_name: &str, fabric: &str) -> String {
    if !contains_any(product_name, DENIM_NAME_KEYWORDS) {
        return fabric.to_string();
    }
    TWILL_CANVAS_RE.replace_all(fabric, "denim").into_owned()
}

/// Drops sentences about the garment front unless they also talk about the back.
pub fn keep_back_relevant_sentences(text: &str) -> Option<String> {
    let kept: Vec<String> = split_sentences(text)
        .into_iter()
        .filter(|sentence| {
            !contains_any(sentence, FRONT_KEYWORDS) || contains_any(sentence, BACK_KEYWORDS)
        })
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}

pub fn apply(prompt: &mut StructuredPrompt, back_view: bool) {
    if let Some(fabric) = prompt.garment.fabric.take() {
        let corrected = correct_denim(&prompt.garment.name, &fabric);
        prompt.garment.fabric = strip_placeholder_tokens(&corrected);
    }
    if let Some(fit) = prompt.garment.fit.take() {
        prompt.garment.fit = strip_placeholder_tokens(&fit);
    }

    if back_view && prompt.garment.workflow == WorkflowType::Upper {
        prompt.garment.fabric = prompt
            .garment
            .fabric
            .take()
            .and_then(|fabric| keep_back_relevant_sentences(&fabric));
        prompt.garment.fit = prompt
            .garment
            .fit
            .take()
            .and_then(|fit| keep_back_relevant_sentences(&fit));
        prompt.analysis.upper = prompt
            .analysis
            .upper
            .take()
            .and_then(|brief| keep_back_relevant_sentences(&brief));
    }
}
