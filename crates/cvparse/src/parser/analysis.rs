//! Derived values computed from an assembled record.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::record::{ExperienceEntry, Record};

static RANGE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+-\s+|\s*[\u{2013}\u{2014}]\s*|\s+to\s+").unwrap());

static YEARS_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*\+?\s*years?\b").unwrap());

static MONTH_YEAR_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[-/.](\d{4})$").unwrap());

static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})$").unwrap());

const DAYS_PER_YEAR: i64 = 365;

/// Longest single "N years" claim taken at face value.
const MAX_CLAIMED_YEARS: i64 = 100;

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Total years of experience across entries, rounded. `None` when nothing
/// parses or the total is not positive.
pub fn estimate_years_experience(entries: &[ExperienceEntry]) -> Option<u32> {
    years_as_of(entries, Utc::now().date_naive())
}

fn years_as_of(entries: &[ExperienceEntry], today: NaiveDate) -> Option<u32> {
    let total_days: i64 = entries
        .iter()
        .filter_map(|entry| entry_days(entry.dates.trim(), today))
        .fold(0i64, i64::saturating_add);

    if total_days <= 0 {
        return None;
    }
    let years = (total_days as f64 / DAYS_PER_YEAR as f64).round() as u32;
    (years > 0).then_some(years)
}

fn entry_days(dates: &str, today: NaiveDate) -> Option<i64> {
    if dates.is_empty() {
        return None;
    }

    if let Some((start, end)) = split_range(dates) {
        let start = parse_date(start)?;
        let end = match end.trim().to_lowercase().as_str() {
            "present" | "now" | "current" => today,
            other => parse_date(other)?,
        };
        return Some((end - start).num_days());
    }

    YEARS_SPAN
        .captures(dates)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .map(|years| years.min(MAX_CLAIMED_YEARS) * DAYS_PER_YEAR)
}

fn split_range(dates: &str) -> Option<(&str, &str)> {
    if let Some(m) = RANGE_SEPARATOR.find(dates) {
        return Some((&dates[..m.start()], &dates[m.end()..]));
    }
    // "2020-2022"; numeric dates like "03-2020" carry their own hyphens.
    match dates.matches('-').count() {
        1 => dates.split_once('-'),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim().replace('.', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Ok(year) = cleaned.parse::<i32>() {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    if let Some(caps) = MONTH_YEAR_NUMERIC.captures(raw.trim()) {
        let month = caps[1].parse().ok()?;
        let year = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    if let Some(caps) = DAY_MONTH_YEAR.captures(raw.trim()) {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let (month, year) = cleaned.split_once(' ')?;
    let month = month_number(month)?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

/// "Jan", "january" and "Sept" all name the same month; anything shorter
/// than three letters is ambiguous.
fn month_number(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| name.starts_with(word.as_str()))
        .map(|index| index as u32 + 1)
}

/// Stable fingerprint of a record's identifying fields, used to spot
/// duplicate uploads. List order does not affect the result.
pub fn generate_content_hash(record: &Record) -> String {
    let info = &record.personal_info;

    let mut skills_flat: Vec<String> = record
        .skills
        .values()
        .flatten()
        .map(|skill| skill.to_lowercase())
        .collect();
    skills_flat.sort();

    let mut experience_titles: Vec<String> = record
        .experience
        .iter()
        .filter(|entry| !entry.position.is_empty())
        .map(|entry| entry.position.to_lowercase())
        .collect();
    experience_titles.sort();

    let mut education_degrees: Vec<String> = record
        .education
        .iter()
        .filter(|entry| !entry.degree.is_empty())
        .map(|entry| entry.degree.to_lowercase())
        .collect();
    education_degrees.sort();

    let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
    fields.insert("name", optional(&info.name));
    fields.insert("email", optional(&info.email));
    fields.insert("phone", optional(&info.phone));
    fields.insert("skills_flat", Value::from(skills_flat));
    fields.insert("experience_titles", Value::from(experience_titles));
    fields.insert("education_degrees", Value::from(education_degrees));

    // BTreeMap keys serialise in sorted order; the output is compact.
    let canonical = serde_json::to_string(&fields).unwrap_or_default();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn optional(value: &Option<String>) -> Value {
    Value::from(value.as_deref().unwrap_or_default())
}
