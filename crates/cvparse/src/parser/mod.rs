//! Heuristic field parsers.
//!
//! Every parser is a pure function over the document text. Multi-entry
//! parsers read their own section when the heading exists and fall back to
//! scanning the whole document otherwise.

pub mod achievements;
pub mod analysis;
pub mod assets;
pub mod certifications;
pub mod education;
pub(crate) mod entries;
pub mod experience;
pub mod languages;
pub mod name;
pub mod personal;
pub mod projects;
pub mod references;
pub mod section;
pub mod skills;

use std::sync::LazyLock;

use regex::Regex;

pub use achievements::extract_achievements;
pub use analysis::{estimate_years_experience, generate_content_hash};
pub use assets::extract_assets;
pub use certifications::extract_certifications;
pub use education::extract_education;
pub use experience::extract_experience;
pub use languages::extract_languages;
pub use name::{extract_name, EntityTagger, NameStrategy, NAME_STRATEGIES};
pub use personal::{
    extract_address, extract_age, extract_email, extract_github, extract_linkedin,
    extract_nationality, extract_phone,
};
pub use projects::{detect_technologies, extract_projects};
pub use references::extract_references;
pub use section::{classify_header, find_section, split_sections, Section, SectionKind};
pub use skills::extract_skills;

static ITEM_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[A-Z0-9•\-*]").unwrap());

/// Regex source matching `term` as a whole word.
///
/// Word boundaries are only placed on edges that are word characters, so
/// terms like `c++` or `.net` still match. Spaces inside the term match any
/// run of whitespace, including none.
pub(crate) fn term_pattern(term: &str, case_insensitive: bool) -> String {
    let escaped = regex::escape(term).replace(' ', r"\s*");
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

    let mut pattern = String::new();
    if case_insensitive {
        pattern.push_str("(?i)");
    }
    if is_word(term.chars().next()) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&escaped);
    if is_word(term.chars().last()) {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Upper-cases the first letter of every word and lower-cases the rest.
pub(crate) fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Whether a line looks like the start of a list item: a capital, a digit or a bullet.
pub(crate) fn starts_like_item(line: &str) -> bool {
    ITEM_START.is_match(line)
}
