//! Structured output of parsing one résumé.
//!
//! Every list and map field is always present: it deserializes to empty when
//! missing and serializes as `[]`/`{}`, never `null`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub age: Option<String>,
    pub nationality: Option<String>,
}

impl PersonalInfo {
    fn merged_with(&self, update: &PersonalInfo) -> PersonalInfo {
        fn pick(original: &Option<String>, update: &Option<String>) -> Option<String> {
            update.clone().or_else(|| original.clone())
        }

        PersonalInfo {
            name: pick(&self.name, &update.name),
            email: pick(&self.email, &update.email),
            phone: pick(&self.phone, &update.phone),
            address: pick(&self.address, &update.address),
            github: pick(&self.github, &update.github),
            linkedin: pick(&self.linkedin, &update.linkedin),
            age: pick(&self.age, &update.age),
            nationality: pick(&self.nationality, &update.nationality),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub dates: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub position: String,
    pub company: String,
    pub dates: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Programming,
    Web,
    Mobile,
    Databases,
    Devops,
    DataScience,
    Soft,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 7] = [
        SkillCategory::Programming,
        SkillCategory::Web,
        SkillCategory::Mobile,
        SkillCategory::Databases,
        SkillCategory::Devops,
        SkillCategory::DataScience,
        SkillCategory::Soft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::Programming => "programming",
            SkillCategory::Web => "web",
            SkillCategory::Mobile => "mobile",
            SkillCategory::Databases => "databases",
            SkillCategory::Devops => "devops",
            SkillCategory::DataScience => "data_science",
            SkillCategory::Soft => "soft",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Skills = BTreeMap<SkillCategory, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Achievement {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    pub name: String,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub personal_info: PersonalInfo,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub skills: Skills,
    pub languages: Vec<String>,
    pub certifications: Vec<Certification>,
    pub projects: Vec<Project>,
    pub achievements: Vec<Achievement>,
    pub assets: Vec<Asset>,
    pub references: Vec<Reference>,
    pub raw_text: String,
}

impl Record {
    /// Returns a new record with `update` layered on top of `self`.
    ///
    /// Scalar fields of `update` win when present; list and map fields of
    /// `update` replace the originals only when non-empty.
    pub fn merged_with(&self, update: &Record) -> Record {
        fn pick<T: Clone>(original: &Vec<T>, update: &Vec<T>) -> Vec<T> {
            if update.is_empty() {
                original.clone()
            } else {
                update.clone()
            }
        }

        Record {
            personal_info: self.personal_info.merged_with(&update.personal_info),
            education: pick(&self.education, &update.education),
            experience: pick(&self.experience, &update.experience),
            skills: if update.skills.is_empty() {
                self.skills.clone()
            } else {
                update.skills.clone()
            },
            languages: pick(&self.languages, &update.languages),
            certifications: pick(&self.certifications, &update.certifications),
            projects: pick(&self.projects, &update.projects),
            achievements: pick(&self.achievements, &update.achievements),
            assets: pick(&self.assets, &update.assets),
            references: pick(&self.references, &update.references),
            raw_text: if update.raw_text.is_empty() {
                self.raw_text.clone()
            } else {
                update.raw_text.clone()
            },
        }
    }

    /// A record without a name is treated as "not a résumé" by the queue.
    pub fn has_name(&self) -> bool {
        self.personal_info
            .name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

/// A record together with the metadata the queue attaches on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub record: Record,
    pub filename: String,
    pub job_id: String,
    pub batch_id: String,
    pub content_hash: String,
    pub years_experience: Option<u32>,
    pub processing_time_ms: u64,
    pub processed_at: DateTime<Utc>,
}
