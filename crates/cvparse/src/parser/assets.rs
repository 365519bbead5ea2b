use crate::parser::entries::{candidate_text, non_empty_lines, strip_bullet, Mode};
use crate::parser::section::SectionKind;
use crate::record::Asset;

/// Keys that belong to contact or personal details, never to assets.
const PERSONAL_KEYS: &[&str] = &[
    "name",
    "full name",
    "email",
    "e-mail",
    "mail",
    "phone",
    "mobile",
    "tel",
    "telephone",
    "contact",
    "address",
    "linkedin",
    "github",
    "website",
    "portfolio",
    "age",
    "nationality",
    "citizenship",
    "gender",
    "sex",
    "date of birth",
    "dob",
    "birthday",
    "marital status",
    "religion",
    "nic",
    "passport",
];

const MAX_KEY_WORDS: usize = 4;

pub fn extract_assets(text: &str) -> Vec<Asset> {
    let (source, mode) = candidate_text(text, SectionKind::Assets);

    non_empty_lines(source)
        .into_iter()
        .map(strip_bullet)
        .filter_map(|line| match mode {
            Mode::Section => section_asset(line),
            Mode::Fallback => key_value_asset(line),
        })
        .collect()
}

fn section_asset(line: &str) -> Option<Asset> {
    match line.split_once(':') {
        Some((kind, description)) => Some(Asset {
            kind: kind.trim().to_string(),
            description: description.trim().to_string(),
        }),
        None => Some(Asset {
            kind: "General".to_string(),
            description: line.to_string(),
        }),
    }
}

fn key_value_asset(line: &str) -> Option<Asset> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let value = value.trim();

    let plausible_key = !key.is_empty()
        && key.split_whitespace().count() <= MAX_KEY_WORDS
        && key.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '&')
        && !PERSONAL_KEYS.contains(&key.to_lowercase().as_str());
    // "https://..." leaves a value starting with "//"
    if !plausible_key || value.is_empty() || value.starts_with("//") {
        return None;
    }

    Some(Asset {
        kind: key.to_string(),
        description: value.to_string(),
    })
}
