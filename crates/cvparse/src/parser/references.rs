use std::sync::LazyLock;

use regex::Regex;

use crate::parser::entries::{candidate_text, group_entries, non_empty_lines};
use crate::parser::section::SectionKind;
use crate::record::Reference;

static PERSON_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:Dr|Mr|Mrs|Ms|Prof)\.?\s+)?[A-Z][a-z]+(?:\s+[A-Z][a-z.'-]*){1,3}$").unwrap()
});

static ON_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)available\s+(?:up)?on\s+request").unwrap());

pub fn extract_references(text: &str) -> Vec<Reference> {
    let (source, mode) = candidate_text(text, SectionKind::References);
    let lines = non_empty_lines(source);

    let mut references: Vec<Reference> =
        group_entries(&lines, mode, |line| PERSON_LINE.is_match(line))
            .iter()
            .map(|lines| Reference {
                name: lines[0].to_string(),
                details: lines[1..].join("\n"),
            })
            .collect();

    if references.is_empty() && ON_REQUEST.is_match(source) {
        references.push(Reference {
            name: "Available upon request".to_string(),
            details: String::new(),
        });
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_blocks() {
        let text = "References\nDr. Amal Silva\nHead of Computing, University of Moratuwa\namal@uom.lk\nMs Jane Smith\nEngineering manager\n";
        let references = extract_references(text);

        assert_eq!(references.len(), 2);
        assert_eq!(references[0].name, "Dr. Amal Silva");
        assert_eq!(
            references[0].details,
            "Head of Computing, University of Moratuwa\namal@uom.lk"
        );
        assert_eq!(references[1].name, "Ms Jane Smith");
        assert_eq!(references[1].details, "Engineering manager");
    }

    #[test]
    fn test_available_upon_request() {
        let references = extract_references("References\nAvailable upon request.");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "Available upon request.");

        let references = extract_references("references available on request");
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "Available upon request");
        assert!(references[0].details.is_empty());
    }
}
