//! Candidate-name extraction as an ordered list of strategies.
//!
//! Résumé headers vary a lot (letter-spaced names, confidentiality banners,
//! plain title lines), so each layout gets its own strategy and the first one
//! that produces a name wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::section::classify_header;

/// Named-entity recogniser that can tag PERSON spans in free text.
pub trait EntityTagger: Send + Sync {
    fn person_entities(&self, text: &str) -> Vec<String>;
}

pub struct NameContext<'a> {
    pub text: &'a str,
    /// Trimmed non-empty lines.
    pub lines: Vec<&'a str>,
    pub tagger: Option<&'a dyn EntityTagger>,
}

impl<'a> NameContext<'a> {
    pub fn new(text: &'a str, tagger: Option<&'a dyn EntityTagger>) -> Self {
        Self {
            text,
            lines: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect(),
            tagger,
        }
    }
}

pub struct NameStrategy {
    pub name: &'static str,
    pub extract: fn(&NameContext<'_>) -> Option<String>,
}

pub const NAME_STRATEGIES: [NameStrategy; 5] = [
    NameStrategy {
        name: "spaced_capitals",
        extract: spaced_capitals,
    },
    NameStrategy {
        name: "first_line",
        extract: first_line,
    },
    NameStrategy {
        name: "after_banner",
        extract: after_banner,
    },
    NameStrategy {
        name: "entity_tagger",
        extract: entity_tagger,
    },
    NameStrategy {
        name: "title_case_scan",
        extract: title_case_scan,
    },
];

static NAME_CHARS_4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s'.]{4,100}$").unwrap());
static NAME_CHARS_3: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s'.]{3,100}$").unwrap());
static NAME_CHARS_5: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s'.]{5,150}$").unwrap());

static CONSOLIDATED_JARGON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hr|generalist|manager|developer|engine|contact|summary|skills|education|experience|curriculum|vitae|resume|cv)\b|@").unwrap()
});
static FIRST_LINE_JARGON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:curriculum|vitae|resume|cv|email|phone|contact|address|linkedin|github|summary|skills|education|experience|profile|objective)\b|@").unwrap()
});
static BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)confidential|external|internal|private").unwrap());
static BANNER_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+|\.com|\.lk|www\.|github|linkedin").unwrap());
static ENTITY_JARGON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:referee|reference|contact|email|phone|summary|skills|education|experience|profile|objective|linkedin|github)\b").unwrap()
});
static CITY_COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+,\s*[A-Z][a-z]+$").unwrap());
static SCAN_REJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@|\b(?:curriculum|vitae|resume|cv|skills|education|experience|summary|objective|profile|professional|contact|address)\b|\d{4}|^\d").unwrap()
});
static TITLE_CASE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]*(?:\s+[A-Z][a-z.']*){0,5}$").unwrap());

const SCAN_LINES: usize = 8;

/// Runs the strategies in order; `None` when none of them finds a name.
pub fn extract_name(text: &str, tagger: Option<&dyn EntityTagger>) -> Option<String> {
    let context = NameContext::new(text, tagger);
    if context.lines.is_empty() {
        return None;
    }

    NAME_STRATEGIES.iter().find_map(|strategy| {
        let name = (strategy.extract)(&context)?;
        tracing::trace!(strategy = strategy.name, "Name found");
        Some(name)
    })
}

fn word_count(line: &str) -> usize {
    line.split_whitespace().count()
}

fn has_digit(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_digit())
}

/// "J A N E   D O E" style first lines.
fn spaced_capitals(context: &NameContext<'_>) -> Option<String> {
    let first = context.lines[0];
    let tokens: Vec<&str> = first.split_whitespace().collect();
    let spaced = tokens.len() >= 2
        && tokens
            .iter()
            .all(|t| t.chars().count() == 1 && t.chars().all(|c| c.is_ascii_uppercase()));
    if !spaced {
        return None;
    }

    if let Some(next) = context.lines.get(1) {
        let words = word_count(next);
        if NAME_CHARS_4.is_match(next)
            && (2..=6).contains(&words)
            && !has_digit(next)
            && !CONSOLIDATED_JARGON.is_match(next)
        {
            return Some(next.to_string());
        }
    }

    Some(collapse_spaced_letters(first))
}

/// Words are separated by runs of two or more spaces; letters by single ones.
fn collapse_spaced_letters(line: &str) -> String {
    static WORD_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

    WORD_GAP
        .split(line.trim())
        .map(|word| word.split_whitespace().collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_line(context: &NameContext<'_>) -> Option<String> {
    let first = context.lines[0];
    let words = word_count(first);
    let title_cased = first
        .split_whitespace()
        .all(|w| w.chars().next().is_some_and(|c| c.is_uppercase()));

    (NAME_CHARS_3.is_match(first)
        && (1..=5).contains(&words)
        && title_cased
        && !FIRST_LINE_JARGON.is_match(first))
    .then(|| first.to_string())
}

fn after_banner(context: &NameContext<'_>) -> Option<String> {
    let (banner, candidate) = (context.lines.first()?, context.lines.get(1)?);
    let words = word_count(candidate);

    (BANNER.is_match(banner)
        && NAME_CHARS_5.is_match(candidate)
        && (2..=8).contains(&words)
        && !has_digit(candidate)
        && !BANNER_NOISE.is_match(candidate))
    .then(|| candidate.to_string())
}

fn entity_tagger(context: &NameContext<'_>) -> Option<String> {
    let tagger = context.tagger?;
    tagger
        .person_entities(context.text)
        .into_iter()
        .map(|entity| entity.trim().to_string())
        .find(|entity| {
            (1..=6).contains(&word_count(entity))
                && !has_digit(entity)
                && !ENTITY_JARGON.is_match(entity)
                && !CITY_COUNTRY.is_match(entity)
        })
}

fn title_case_scan(context: &NameContext<'_>) -> Option<String> {
    context
        .lines
        .iter()
        .take(SCAN_LINES)
        .find(|line| {
            !SCAN_REJECT.is_match(line)
                && classify_header(line).is_none()
                && TITLE_CASE_LINE.is_match(line)
        })
        .map(|line| line.to_string())
}
