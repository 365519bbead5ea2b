use std::sync::LazyLock;

use regex::Regex;

use crate::parser::entries::{
    candidate_text, group_entries, is_bulleted, non_empty_lines, split_dates, split_labels,
    word_separator, Separator,
};
use crate::parser::section::SectionKind;
use crate::record::ExperienceEntry;

static PREPOSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at|in|for|with)\b").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static CAPITALISED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]+(?:\s+[A-Z][a-z.]+)*").unwrap());

static AT_WITH_FOR: LazyLock<Regex> = LazyLock::new(|| word_separator(&["at", "with", "for"]));
static IN: LazyLock<Regex> = LazyLock::new(|| word_separator(&["in"]));

fn is_entry_start(line: &str) -> bool {
    !is_bulleted(line)
        && PREPOSITION.is_match(line)
        && (YEAR.is_match(line) || CAPITALISED.is_match(line))
}

pub fn extract_experience(text: &str) -> Vec<ExperienceEntry> {
    let (source, mode) = candidate_text(text, SectionKind::Experience);
    let lines = non_empty_lines(source);

    group_entries(&lines, mode, is_entry_start)
        .iter()
        .map(|lines| parse_experience_entry(&lines.join("\n")))
        .filter(|entry| !entry.position.is_empty() || !entry.company.is_empty())
        .collect()
}

fn parse_experience_entry(entry_text: &str) -> ExperienceEntry {
    let (dates, remainder) = split_dates(entry_text);
    let separators = [
        Separator::Pattern(&AT_WITH_FOR),
        Separator::Comma,
        Separator::Pattern(&IN),
    ];
    let (position, company) = split_labels(&remainder, &separators);

    ExperienceEntry {
        position,
        company,
        dates,
        description: entry_text.trim().to_string(),
    }
}
