use std::sync::LazyLock;

use regex::Regex;

use crate::parser::section::{find_section, SectionKind};
use crate::parser::{term_pattern, title_case};
use crate::record::{SkillCategory, Skills};

const TAXONOMY: &[(SkillCategory, &[&str])] = &[
    (
        SkillCategory::Programming,
        &[
            "java", "python", "javascript", "typescript", "c++", "c#", "ruby", "php", "swift",
            "kotlin", "go", "rust", "scala", "dart", "perl", "r",
        ],
    ),
    (
        SkillCategory::Web,
        &[
            "html", "css", "sass", "less", "bootstrap", "tailwind", "jquery", "react", "angular",
            "vue", "ember", "svelte", "next.js", "nuxt.js",
        ],
    ),
    (
        SkillCategory::Mobile,
        &["android", "ios", "flutter", "react native", "xamarin", "swiftui"],
    ),
    (
        SkillCategory::Databases,
        &[
            "mysql", "postgresql", "mongodb", "sql server", "oracle", "sqlite", "neo4j",
            "cassandra", "redis", "dynamodb", "firebase",
        ],
    ),
    (
        SkillCategory::Devops,
        &[
            "docker", "kubernetes", "aws", "azure", "gcp", "jenkins", "ansible", "terraform",
            "github actions", "gitlab ci", "circleci", "prometheus", "grafana",
        ],
    ),
    (
        SkillCategory::DataScience,
        &[
            "pandas", "numpy", "tensorflow", "pytorch", "scikit-learn", "keras", "spark",
            "hadoop", "tableau", "power bi",
        ],
    ),
    (
        SkillCategory::Soft,
        &[
            "communication", "teamwork", "leadership", "problem solving", "time management",
            "adaptability", "creativity", "critical thinking", "negotiation", "presentation",
            "project management",
        ],
    ),
];

struct SkillMatcher {
    category: SkillCategory,
    pattern: Regex,
    label: String,
}

static MATCHERS: LazyLock<Vec<SkillMatcher>> = LazyLock::new(|| {
    TAXONOMY
        .iter()
        .flat_map(|(category, terms)| {
            terms.iter().map(move |term| SkillMatcher {
                category: *category,
                pattern: Regex::new(&term_pattern(term, true)).unwrap(),
                label: title_case(&term.replace('-', " ")),
            })
        })
        .collect()
});

/// Skills found in the skills section (or the whole text), grouped by category.
/// Categories without a match are left out of the map.
pub fn extract_skills(text: &str) -> Skills {
    let section = find_section(text, SectionKind::Skills);
    let haystack = if section.trim().is_empty() {
        text.to_lowercase()
    } else {
        section.to_lowercase()
    };

    let mut skills = Skills::new();
    for matcher in MATCHERS.iter() {
        if !matcher.pattern.is_match(&haystack) {
            continue;
        }
        let found = skills.entry(matcher.category).or_default();
        if !found.contains(&matcher.label) {
            found.push(matcher.label.clone());
        }
    }

    skills
}
