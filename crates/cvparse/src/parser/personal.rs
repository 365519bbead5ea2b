use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\b"#,
    )
    .unwrap()
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\+\d{1,3}[-. ]?)?\(?\d{1,4}\)?[-. ]?\d{1,4}[-. ]?\d{1,9}(?:[ ]?(?:ext|x|extension)\.?[ ]?\d+)?",
    )
    .unwrap()
});

static YEAR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:19|20)\d{2}\s*[-\u{2013}]\s*(?:19|20)\d{2}$").unwrap());

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{1,5}\s+[A-Za-z0-9\s.]{3,}?\s*,\s*[A-Za-z\s.]{3,},?\s*(?:[A-Z]{2}|\w+),?\s*\d{5,6}(?:-\d{4})?",
    )
    .unwrap()
});

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/([a-zA-Z0-9\-_]+)").unwrap()
});

static AT_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9\-_]+)").unwrap());

static LINKEDIN_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:(?:https?://)?(?:www\.)?linkedin\.com/in/)([a-zA-Z0-9\-_%]{2,100})/?[ \t]*\r?\n[ \t]*([a-z0-9\-_%][a-zA-Z0-9\-_%]{1,99})/?[ \t]*(?:\r?\n|$)",
    )
    .unwrap()
});

static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/(?:in/)?([a-zA-Z0-9\-_%]{2,100})/?")
        .unwrap()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bage\s*:?\s*(\d{2})\b|\b(\d{2})\s*years?\s*old\b)").unwrap()
});

static NATIONALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:nationality|citizen(?:ship)?)\s*:?\s*([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)*)")
        .unwrap()
});

const MIN_PHONE_DIGITS: usize = 7;
const MAX_GITHUB_USERNAME: usize = 39;

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// The longest phone-shaped run with at least seven digits.
pub fn extract_phone(text: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    for candidate in PHONE.find_iter(text).map(|m| m.as_str().trim()) {
        let digits = candidate.chars().filter(char::is_ascii_digit).count();
        if digits < MIN_PHONE_DIGITS || YEAR_RANGE.is_match(candidate) {
            continue;
        }
        match best {
            Some(current) if candidate.len() <= current.len() => {}
            _ => best = Some(candidate),
        }
    }
    best.map(str::to_string)
}

pub fn extract_address(text: &str) -> Option<String> {
    ADDRESS.find(text).map(|m| m.as_str().trim().to_string())
}

/// A `github.com/<user>` link or, failing that, a standalone `@handle`.
pub fn extract_github(text: &str) -> Option<String> {
    let from_url = GITHUB_URL
        .captures(text)
        .map(|caps| caps[1].to_string())
        .filter(|user| user.len() <= MAX_GITHUB_USERNAME);
    if let Some(user) = from_url {
        return Some(format!("https://github.com/{}", user));
    }

    AT_HANDLE
        .captures_iter(text)
        .filter(|caps| {
            // Part of an email address when glued to the preceding word.
            let at = caps.get(0).map(|m| m.start()).unwrap_or(0);
            !text[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '+' | '%'))
        })
        .map(|caps| caps[1].to_string())
        .find(|user| user.len() <= MAX_GITHUB_USERNAME)
        .map(|user| format!("https://github.com/{}", user))
}

pub fn extract_linkedin(text: &str) -> Option<String> {
    if let Some(caps) = LINKEDIN_SPLIT.captures(text) {
        let first = caps[1].trim_end_matches(['/', '.']);
        let second = caps[2].trim_end_matches(['/', '.']);
        return Some(format!("https://www.linkedin.com/in/{}{}", first, second));
    }

    let normalized = WHITESPACE.replace_all(text, " ");
    [normalized.as_ref(), text]
        .iter()
        .find_map(|haystack| LINKEDIN.captures(haystack))
        .map(|caps| {
            format!(
                "https://www.linkedin.com/in/{}",
                caps[1].trim_end_matches(['/', '.'])
            )
        })
}

pub fn extract_age(text: &str) -> Option<String> {
    AGE.captures(text).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

pub fn extract_nationality(text: &str) -> Option<String> {
    NATIONALITY
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
}
