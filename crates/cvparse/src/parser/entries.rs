//! Shared machinery for the multi-entry parsers: candidate text selection,
//! grouping lines into entries, and splitting an entry into labels and dates.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::section::{find_section, SectionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Parsing the text under a recognised heading.
    Section,
    /// No heading; the whole document is the candidate pool.
    Fallback,
}

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    let point = format!(r"(?:{MONTH}\s+)?(?:\d{{1,2}}[-/.])?(?:19|20)\d{{2}}");
    Regex::new(&format!(
        r"(?i)\b({point})\s*(?:[-\u{{2013}}\u{{2014}}]|\bto\b)\s*({point}|present\b|now\b|current\b)"
    ))
    .unwrap()
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[•\-*\u{25AA}\u{25E6}]|\d+[.)])\s*").unwrap());

/// The section text if the heading exists, otherwise the whole document.
pub(crate) fn candidate_text(text: &str, kind: SectionKind) -> (&str, Mode) {
    let section = find_section(text, kind);
    if section.trim().is_empty() {
        (text, Mode::Fallback)
    } else {
        (section, Mode::Section)
    }
}

pub(crate) fn non_empty_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Groups lines into entries, starting a new entry at every line matching
/// `is_start`. In section mode the first line always opens an entry; in
/// fallback mode lines before the first matching line are dropped.
pub(crate) fn group_entries<'a, F>(lines: &[&'a str], mode: Mode, is_start: F) -> Vec<Vec<&'a str>>
where
    F: Fn(&str) -> bool,
{
    let mut entries: Vec<Vec<&'a str>> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let opens = is_start(line) || (index == 0 && mode == Mode::Section);
        if opens {
            entries.push(vec![*line]);
        } else if let Some(current) = entries.last_mut() {
            current.push(*line);
        }
    }

    entries
}

pub(crate) fn is_bulleted(line: &str) -> bool {
    BULLET.is_match(line)
}

pub(crate) fn strip_bullet(line: &str) -> &str {
    match BULLET.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line.trim(),
    }
}

/// Removes the first date range, or failing that every standalone year.
/// Returns the normalised dates string and the remaining text.
pub(crate) fn split_dates(entry: &str) -> (String, String) {
    if let Some(caps) = DATE_RANGE.captures(entry) {
        let dates = format!("{} - {}", caps[1].trim(), caps[2].trim());
        let remainder = DATE_RANGE.replace(entry, "").into_owned();
        return (dates, clean_lines(&remainder));
    }

    let years: Vec<&str> = YEAR.find_iter(entry).map(|m| m.as_str()).collect();
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => {
            let dates = if first == last {
                first.to_string()
            } else {
                format!("{} - {}", first, last)
            };
            let remainder = YEAR.replace_all(entry, "").into_owned();
            (dates, clean_lines(&remainder))
        }
        _ => (String::new(), clean_lines(entry)),
    }
}

/// Trims every line of leftover separators once dates are cut out.
fn clean_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            collapsed
                .trim_matches(|c: char| c.is_whitespace() || matches!(c, '|' | ',' | '(' | ')' | '-' | '\u{2013}' | '\u{2014}'))
                .replace("()", "")
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A separator tried against an entry's first line.
pub(crate) enum Separator {
    Pattern(&'static Regex),
    Comma,
}

/// Case-insensitive whole-word alternation, swallowing surrounding spaces.
pub(crate) fn word_separator(words: &[&str]) -> Regex {
    Regex::new(&format!(r"(?i)\s*\b(?:{})\b\s*", words.join("|"))).unwrap()
}

/// Splits an entry into a primary and secondary label.
///
/// Separators are tried against the first line in order; the first one that
/// occurs wins. Without a separator the second line becomes the secondary
/// label.
pub(crate) fn split_labels(remainder: &str, separators: &[Separator]) -> (String, String) {
    let mut lines = remainder.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return (String::new(), String::new());
    };
    let first = strip_bullet(first);

    for separator in separators {
        let found = match separator {
            Separator::Pattern(pattern) => pattern.find(first).map(|m| (m.start(), m.end())),
            Separator::Comma => first.find(',').map(|i| (i, i + 1)),
        };
        if let Some((start, end)) = found {
            return (
                first[..start].trim().to_string(),
                first[end..].trim().to_string(),
            );
        }
    }

    match lines.next() {
        Some(second) => (first.to_string(), strip_bullet(second).to_string()),
        None => {
            let mut parts = first.split(',').map(str::trim).filter(|p| !p.is_empty());
            let primary = parts.next().unwrap_or("").to_string();
            let secondary = parts.collect::<Vec<_>>().join(", ");
            (primary, secondary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_dates_range() {
        let (dates, rest) = split_dates("Software Engineer at Acme (Jan 2019 - Present)");
        assert_eq!(dates, "Jan 2019 - Present");
        assert_eq!(rest, "Software Engineer at Acme");
    }

    #[test]
    fn test_split_dates_en_dash_and_to() {
        assert_eq!(split_dates("2015 \u{2013} 2018").0, "2015 - 2018");
        assert_eq!(split_dates("03/2020 to 06/2021 Analyst").0, "03/2020 - 06/2021");
    }

    #[test]
    fn test_split_dates_standalone_years() {
        let (dates, rest) = split_dates("BSc Physics, 2014, graduated 2017");
        assert_eq!(dates, "2014 - 2017");
        assert_eq!(rest, "BSc Physics, , graduated");

        let (dates, _) = split_dates("Diploma 2012");
        assert_eq!(dates, "2012");
    }

    #[test]
    fn test_split_dates_none() {
        let (dates, rest) = split_dates("Team Lead at Initech");
        assert!(dates.is_empty());
        assert_eq!(rest, "Team Lead at Initech");
    }

    #[test]
    fn test_group_entries_section_mode_opens_on_first_line() {
        let lines = ["intro line", "Start one", "detail", "Start two"];
        let entries = group_entries(&lines, Mode::Section, |l| l.starts_with("Start"));
        assert_eq!(
            entries,
            vec![vec!["intro line"], vec!["Start one", "detail"], vec!["Start two"]]
        );
    }

    #[test]
    fn test_group_entries_fallback_drops_leading_lines() {
        let lines = ["intro line", "Start one", "detail"];
        let entries = group_entries(&lines, Mode::Fallback, |l| l.starts_with("Start"));
        assert_eq!(entries, vec![vec!["Start one", "detail"]]);
    }

    static AT_FROM: LazyLock<Regex> = LazyLock::new(|| word_separator(&["at", "from"]));
    static IN: LazyLock<Regex> = LazyLock::new(|| word_separator(&["in"]));

    #[test]
    fn test_split_labels_priority() {
        let separators = [
            Separator::Pattern(&AT_FROM),
            Separator::Comma,
            Separator::Pattern(&IN),
        ];

        let (primary, secondary) = split_labels("BSc in Physics, University of Leeds", &separators);
        assert_eq!(primary, "BSc in Physics");
        assert_eq!(secondary, "University of Leeds");

        let (primary, secondary) = split_labels("MSc from Imperial College", &separators);
        assert_eq!(primary, "MSc");
        assert_eq!(secondary, "Imperial College");

        let (primary, secondary) = split_labels("BA in History", &separators);
        assert_eq!(primary, "BA");
        assert_eq!(secondary, "History");
    }

    #[test]
    fn test_split_labels_second_line() {
        let (primary, secondary) = split_labels("Data Scientist\nGlobex Corporation", &[Separator::Comma]);
        assert_eq!(primary, "Data Scientist");
        assert_eq!(secondary, "Globex Corporation");
    }

    #[test]
    fn test_separator_needs_word_boundaries() {
        let (primary, secondary) =
            split_labels("Data Analyst", &[Separator::Pattern(&AT_FROM)]);
        assert_eq!(primary, "Data Analyst");
        assert!(secondary.is_empty());
    }

    #[test]
    fn test_strip_bullet() {
        assert_eq!(strip_bullet("• AWS Certified"), "AWS Certified");
        assert_eq!(strip_bullet("- Built a compiler"), "Built a compiler");
        assert_eq!(strip_bullet("2. Second place"), "Second place");
        assert_eq!(strip_bullet("Plain"), "Plain");
    }
}
