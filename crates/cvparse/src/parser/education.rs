use std::sync::LazyLock;

use regex::Regex;

use crate::parser::entries::{
    candidate_text, group_entries, is_bulleted, non_empty_lines, split_dates, split_labels,
    word_separator, Separator,
};
use crate::parser::section::SectionKind;
use crate::record::EducationEntry;

static DEGREE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:B\.?A\.?|B\.?Sc\.?|B\.?S\.?|Bachelor|B\.?Tech\.?|M\.?A\.?|M\.?Sc\.?|M\.?S\.?|Master|Ph\.?D\.?|PhD|Doctorate|Diploma|Certificate|A-levels?|O-levels?|HND|Foundation|Associate)\b").unwrap()
});

static DEGREE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:B\.?A\.?|B\.?Sc\.?|B\.?S\.?|Bachelor|M\.?A\.?|M\.?Sc\.?|M\.?S\.?|Master|Ph\.?D\.?|PhD|Doctorate|Diploma|Certificate|HND)(?:\b|$)").unwrap()
});

static INSTITUTION_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)University|College|Institute|School").unwrap());

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static AT_FROM: LazyLock<Regex> = LazyLock::new(|| word_separator(&["at", "from"]));
static IN: LazyLock<Regex> = LazyLock::new(|| word_separator(&["in"]));

fn is_entry_start(line: &str) -> bool {
    !is_bulleted(line)
        && (DEGREE_KEYWORD.is_match(line)
            || YEAR.is_match(line)
            || INSTITUTION_KEYWORD.is_match(line))
}

pub fn extract_education(text: &str) -> Vec<EducationEntry> {
    let (source, mode) = candidate_text(text, SectionKind::Education);
    let lines = non_empty_lines(source);

    group_entries(&lines, mode, is_entry_start)
        .iter()
        .map(|lines| parse_education_entry(&lines.join("\n")))
        .filter(|entry| !entry.degree.is_empty() || !entry.institution.is_empty())
        .collect()
}

fn parse_education_entry(entry_text: &str) -> EducationEntry {
    let (dates, remainder) = split_dates(entry_text);
    let separators = [
        Separator::Pattern(&AT_FROM),
        Separator::Comma,
        Separator::Pattern(&IN),
    ];
    let (mut degree, mut institution) = split_labels(&remainder, &separators);

    if !degree.is_empty() && institution.is_empty() && INSTITUTION_KEYWORD.is_match(&degree) {
        institution = std::mem::take(&mut degree);
    }

    if degree.is_empty() && !institution.is_empty() && DEGREE_KEYWORD.is_match(&institution) {
        let starts_with_degree = DEGREE_WORD.is_match(&institution);
        if starts_with_degree || institution.split_whitespace().count() <= 1 {
            degree = std::mem::take(&mut institution);
        }
    }

    EducationEntry {
        degree,
        institution,
        dates,
        description: entry_text.trim().to_string(),
    }
}
