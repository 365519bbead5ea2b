//! Builders for test inputs.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

use cvparse::Config;

/// Builder for plain résumé text laid out the way exported CVs usually are:
/// contact block first, then headed sections separated by blank lines.
pub struct ResumeBuilder {
    header: Vec<String>,
    sections: Vec<(String, Vec<String>)>,
}

impl ResumeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            header: vec![name.to_string()],
            sections: Vec::new(),
        }
    }

    /// Adds a line to the contact block under the name.
    pub fn contact(mut self, line: &str) -> Self {
        self.header.push(line.to_string());
        self
    }

    pub fn section(mut self, heading: &str, lines: &[&str]) -> Self {
        self.sections.push((
            heading.to_string(),
            lines.iter().map(|line| line.to_string()).collect(),
        ));
        self
    }

    /// One line per paragraph, blank paragraphs between blocks.
    pub fn paragraphs(&self) -> Vec<String> {
        let mut paragraphs = self.header.clone();
        for (heading, lines) in &self.sections {
            paragraphs.push(String::new());
            paragraphs.push(heading.clone());
            paragraphs.extend(lines.iter().cloned());
        }
        paragraphs
    }

    pub fn text(&self) -> String {
        let mut text = self.paragraphs().join("\n");
        text.push('\n');
        text
    }

    /// Writes the résumé as a DOCX file into `dir`.
    pub fn write_docx(&self, dir: &Path, file_name: &str) -> PathBuf {
        let paragraphs = self.paragraphs();
        let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        write_docx(dir, file_name, &refs)
    }
}

/// A fairly complete résumé used by several tests.
pub fn sample_resume() -> ResumeBuilder {
    ResumeBuilder::new("Jane Doe")
        .contact("jane.doe@example.com | +1 555 123 4567")
        .section("Skills", &["Python, Docker, Leadership"])
        .section(
            "Experience",
            &["Software Engineer at Acme Corp, 2018 - 2022"],
        )
        .section(
            "Education",
            &["BSc Computer Science, University of Leeds, 2015 - 2018"],
        )
        .section("Languages", &["English, French"])
}

/// Wraps paragraphs in a minimal `word/document.xml` inside a zip archive.
pub fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|paragraph| {
            format!(
                "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                paragraph
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;")
            )
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .expect("Failed to start docx entry");
        zip.write_all(xml.as_bytes()).expect("Failed to write docx entry");
        zip.finish().expect("Failed to finish docx archive");
    }
    buffer.into_inner()
}

pub fn write_docx(dir: &Path, file_name: &str, paragraphs: &[&str]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, build_docx(paragraphs)).expect("Failed to write docx fixture");
    path
}

/// Builder for queue configurations with fast polling so tests finish quickly.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                max_concurrent_extractions: 1,
                poll_interval_ms: 10,
                demotion_backoff_ms: 10,
                ..Config::default()
            },
        }
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.max_concurrent_extractions = count;
        self
    }

    pub fn queue_size(mut self, size: usize) -> Self {
        self.config.max_queue_size = Some(size);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn job_timeout_secs(mut self, secs: u64) -> Self {
        self.config.job_timeout_secs = secs;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
