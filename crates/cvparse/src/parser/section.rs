//! Section boundary detection.
//!
//! A header is a whole line naming a section ("Education", "Work Experience:"),
//! compared case-insensitively with surrounding whitespace and a trailing colon
//! ignored. A section runs from the first non-blank line after its header up to
//! the next blank line or the next header.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    PersonalInfo,
    Summary,
    Skills,
    Education,
    Experience,
    Projects,
    Languages,
    Certifications,
    Achievements,
    Assets,
    References,
    Additional,
}

impl SectionKind {
    pub const ALL: [SectionKind; 12] = [
        SectionKind::PersonalInfo,
        SectionKind::Summary,
        SectionKind::Skills,
        SectionKind::Education,
        SectionKind::Experience,
        SectionKind::Projects,
        SectionKind::Languages,
        SectionKind::Certifications,
        SectionKind::Achievements,
        SectionKind::Assets,
        SectionKind::References,
        SectionKind::Additional,
    ];

    /// Heading forms recognised for this kind, lower-case with single spaces.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            SectionKind::PersonalInfo => &[
                "personal information",
                "personal details",
                "contact details",
                "contact information",
            ],
            SectionKind::Summary => &[
                "profile",
                "summary",
                "professional summary",
                "career summary",
                "objective",
                "career objective",
                "about me",
            ],
            SectionKind::Skills => &[
                "skills",
                "technical skills",
                "key skills",
                "competencies",
                "core competencies",
            ],
            SectionKind::Education => &[
                "education",
                "academic",
                "academic background",
                "academic qualification",
                "academic qualifications",
                "qualifications",
                "university",
            ],
            SectionKind::Experience => &[
                "experience",
                "work experience",
                "professional experience",
                "employment history",
                "professional history",
                "career history",
                "work history",
            ],
            SectionKind::Projects => &["projects", "portfolio", "personal work", "academic work"],
            SectionKind::Languages => &["languages", "language", "language proficiency"],
            SectionKind::Certifications => &[
                "certifications",
                "certification",
                "licenses",
                "license",
                "credentials",
                "credential",
            ],
            SectionKind::Achievements => &[
                "achievements",
                "awards",
                "competitions",
                "honors",
                "honours",
                "honor",
            ],
            SectionKind::Assets => &["assets", "strengths", "attributes", "key strengths", "key strength"],
            SectionKind::References => &["references", "reference", "referees", "referee"],
            SectionKind::Additional => &["additional information"],
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::PersonalInfo => "personal_info",
            SectionKind::Summary => "summary",
            SectionKind::Skills => "skills",
            SectionKind::Education => "education",
            SectionKind::Experience => "experience",
            SectionKind::Projects => "projects",
            SectionKind::Languages => "languages",
            SectionKind::Certifications => "certifications",
            SectionKind::Achievements => "achievements",
            SectionKind::Assets => "assets",
            SectionKind::References => "references",
            SectionKind::Additional => "additional",
        };
        f.write_str(name)
    }
}

/// Every synonym paired with its kind, longest first.
static HEADERS: LazyLock<Vec<(&'static str, SectionKind)>> = LazyLock::new(|| {
    let mut headers: Vec<(&'static str, SectionKind)> = SectionKind::ALL
        .iter()
        .flat_map(|kind| kind.synonyms().iter().map(move |s| (*s, *kind)))
        .collect();
    headers.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    headers
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    pub kind: SectionKind,
    pub text: &'a str,
}

/// Returns the section kind if `line` is a heading.
pub fn classify_header(line: &str) -> Option<SectionKind> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_suffix(':').unwrap_or(trimmed).trim_end();
    // Headers are short; skip the normalisation work for body lines.
    if trimmed.is_empty() || trimmed.len() > 40 {
        return None;
    }

    let normalized = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    HEADERS
        .iter()
        .find(|(synonym, _)| *synonym == normalized)
        .map(|(_, kind)| *kind)
}

/// Text of the first `kind` section, or `""` when the document has no such heading.
pub fn find_section(text: &str, kind: SectionKind) -> &str {
    let lines = line_spans(text);
    lines
        .iter()
        .position(|(_, line)| classify_header(line) == Some(kind))
        .map(|index| capture_after(text, &lines, index))
        .unwrap_or("")
}

/// Every detected section in document order.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let lines = line_spans(text);
    lines
        .iter()
        .enumerate()
        .filter_map(|(index, (_, line))| {
            classify_header(line).map(|kind| Section {
                kind,
                text: capture_after(text, &lines, index),
            })
        })
        .collect()
}

fn capture_after<'a>(text: &'a str, lines: &[(usize, &'a str)], header_index: usize) -> &'a str {
    let mut body = lines[header_index + 1..]
        .iter()
        .skip_while(|(_, line)| line.trim().is_empty());

    let Some(&(start, first)) = body.next() else {
        return "";
    };
    if classify_header(first).is_some() {
        return "";
    }

    let mut end = start + first.len();
    for &(offset, line) in body {
        if line.trim().is_empty() || classify_header(line).is_some() {
            break;
        }
        end = offset + line.len();
    }

    &text[start..end]
}

/// Lines with their byte offsets; a trailing `\r` is not part of the line.
fn line_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        spans.push((offset, line));
        offset += raw.len() + 1;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_then_three_lines_then_blank() {
        let text = "Jane Doe\n\nEducation\nBSc Computer Science\nUniversity of Leeds\n2015 - 2018\n\nSomething else";
        assert_eq!(
            find_section(text, SectionKind::Education),
            "BSc Computer Science\nUniversity of Leeds\n2015 - 2018"
        );
    }

    #[test]
    fn test_missing_heading_is_empty() {
        let text = "Jane Doe\nPython, Rust\n";
        assert_eq!(find_section(text, SectionKind::Education), "");
        assert_eq!(find_section("", SectionKind::Skills), "");
    }

    #[test]
    fn test_stops_at_next_heading() {
        let text = "Skills\nPython\nDocker\nWork Experience:\nEngineer at Acme";
        assert_eq!(find_section(text, SectionKind::Skills), "Python\nDocker");
        assert_eq!(
            find_section(text, SectionKind::Experience),
            "Engineer at Acme"
        );
    }

    #[test]
    fn test_blank_lines_after_heading_are_skipped() {
        let text = "LANGUAGES\n\n\nEnglish\nFrench\n";
        assert_eq!(find_section(text, SectionKind::Languages), "English\nFrench");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "Projects\nFirst\n\nProjects\nSecond";
        assert_eq!(find_section(text, SectionKind::Projects), "First");
    }

    #[test]
    fn test_heading_directly_followed_by_heading_is_empty() {
        let text = "Achievements\nReferences\nDr Jane Smith";
        assert_eq!(find_section(text, SectionKind::Achievements), "");
        assert_eq!(find_section(text, SectionKind::References), "Dr Jane Smith");
    }

    #[test]
    fn test_classify_header_normalisation() {
        assert_eq!(
            classify_header("  Technical   Skills : "),
            Some(SectionKind::Skills)
        );
        assert_eq!(
            classify_header("WORK EXPERIENCE"),
            Some(SectionKind::Experience)
        );
        assert_eq!(classify_header("Experience in Rust"), None);
        assert_eq!(classify_header(""), None);
    }

    #[test]
    fn test_crlf_lines() {
        let text = "Skills\r\nRust\r\nGo\r\n\r\nEducation\r\nBSc";
        assert_eq!(find_section(text, SectionKind::Skills), "Rust\r\nGo");
    }

    #[test]
    fn test_split_sections_in_document_order() {
        let text = "Jane Doe\nSummary\nBuilds things\n\nSkills\nRust\n\nEducation\nBSc Physics";
        let sections = split_sections(text);
        let kinds: Vec<SectionKind> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Summary,
                SectionKind::Skills,
                SectionKind::Education
            ]
        );
        assert_eq!(sections[1].text, "Rust");
    }

    #[test]
    fn test_headers_sorted_longest_first() {
        let lengths: Vec<usize> = HEADERS.iter().map(|(s, _)| s.len()).collect();
        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
    }
}
