use std::sync::LazyLock;

use regex::Regex;

use crate::parser::entries::{candidate_text, group_entries, non_empty_lines, strip_bullet};
use crate::parser::section::SectionKind;
use crate::parser::{starts_like_item, term_pattern};
use crate::record::Project;

/// Technologies recognised in project descriptions, in their display spelling.
const TECHNOLOGIES: &[&str] = &[
    "Java", "Python", "JavaScript", "TypeScript", "C++", "C#", "Ruby", "PHP", "Swift", "Kotlin",
    "Go", "Rust", "Scala", "R", "Dart", "Perl", "HTML", "CSS", "Sass", "Less", "Bootstrap",
    "Tailwind", "jQuery", "React", "Angular", "Vue", "Ember", "Svelte", "Next.js", "Nuxt.js",
    "Django", "Flask", "Node.js", "Express", "Spring", "Docker", "Kubernetes", "AWS", "Azure",
    "GCP", "MySQL", "PostgreSQL", "MongoDB", "Redis", "TensorFlow", "PyTorch",
];

static TECH_MATCHERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    TECHNOLOGIES
        .iter()
        .map(|tech| {
            // One- and two-letter names ("Go", "R") only count with their exact casing.
            let case_insensitive = tech.chars().filter(|c| c.is_alphanumeric()).count() > 2;
            (*tech, Regex::new(&term_pattern(tech, case_insensitive)).unwrap())
        })
        .collect()
});

static NAME_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":|\s[-\u{2013}]\s").unwrap());

pub fn extract_projects(text: &str) -> Vec<Project> {
    let (source, mode) = candidate_text(text, SectionKind::Projects);
    let lines = non_empty_lines(source);

    group_entries(&lines, mode, starts_like_item)
        .iter()
        .map(|lines| parse_project(lines))
        .filter(|project| !project.name.is_empty())
        .collect()
}

fn parse_project(lines: &[&str]) -> Project {
    let first_line = lines.first().map(|l| strip_bullet(l)).unwrap_or("");
    let rest = lines.iter().skip(1).copied().collect::<Vec<_>>().join("\n");

    let (name, description) = match NAME_SPLIT.find(first_line) {
        Some(m) => {
            let tail = first_line[m.end()..].trim();
            let description = if rest.is_empty() {
                tail.to_string()
            } else {
                format!("{}\n{}", tail, rest)
            };
            (first_line[..m.start()].trim().to_string(), description)
        }
        None => {
            let name = first_line.split(',').next().unwrap_or("").trim().to_string();
            (name, lines.join("\n"))
        }
    };

    let technologies = detect_technologies(&lines.join("\n"));

    Project {
        name,
        description: description.trim().to_string(),
        technologies,
    }
}

/// Vocabulary technologies mentioned in `text`, in first-mention order.
pub fn detect_technologies(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &'static str)> = TECH_MATCHERS
        .iter()
        .filter_map(|(tech, pattern)| pattern.find(text).map(|m| (m.start(), *tech)))
        .collect();
    found.sort_by_key(|(position, _)| *position);

    let mut technologies: Vec<String> = Vec::new();
    for (_, tech) in found {
        if !technologies.iter().any(|t| t.eq_ignore_ascii_case(tech)) {
            technologies.push(tech.to_string());
        }
    }
    technologies
}
