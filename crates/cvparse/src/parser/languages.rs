use std::sync::LazyLock;

use regex::Regex;

use crate::parser::section::{find_section, SectionKind};

const KNOWN_LANGUAGES: [&str; 27] = [
    "english", "spanish", "french", "german", "chinese", "hindi", "arabic", "portuguese",
    "russian", "japanese", "dutch", "italian", "korean", "flemish", "sinhala", "tamil", "telugu",
    "punjabi", "bengali", "urdu", "persian", "turkish", "swedish", "norwegian", "danish",
    "finnish", "polish",
];

static CAPITALISED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]{2,}\b").unwrap());

/// Spoken languages named in the languages section, or anywhere in the text
/// when there is no such section. First-seen order, no duplicates.
pub fn extract_languages(text: &str) -> Vec<String> {
    let section = find_section(text, SectionKind::Languages);
    let source = if section.trim().is_empty() { text } else { section };

    let mut languages: Vec<String> = Vec::new();
    for word in CAPITALISED_WORD.find_iter(source).map(|m| m.as_str()) {
        let lower = word.to_lowercase();
        if KNOWN_LANGUAGES.contains(&lower.as_str()) && !languages.iter().any(|l| l == word) {
            languages.push(word.to_string());
        }
    }

    languages
}
