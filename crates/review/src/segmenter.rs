//! Section segmentation for scientific papers
//!
//! Matches each line against a fixed set of heading patterns (tolerant of
//! numbered headings) and produces ordered sections with character-offset
//! spans into the input text.

use regex_lite::Regex;
use std::sync::OnceLock;

/// A paper section with its character span
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

fn section_patterns() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"^\s*(?i:Abstract|Summary)\s*$", "abstract"),
            (r"^\s*(?:1\s*\.?\s*)?(?i:Introduction|Intro)\s*$", "introduction"),
            (
                r"^\s*(?:2\s*\.?\s*)?(?i:Related\s+Work|Background|Literature\s+Review)\s*$",
                "related_work",
            ),
            (
                r"^\s*(?:3\s*\.?\s*)?(?i:Method|Methodology|Approach|Model|Architecture)\s*$",
                "method",
            ),
            (r"^\s*(?:4\s*\.?\s*)?(?i:Experiments?|Evaluation|Results?)\s*$", "results"),
            (r"^\s*(?:5\s*\.?\s*)?(?i:Discussion|Analysis|Interpretation)\s*$", "discussion"),
            (r"^\s*(?:6\s*\.?\s*)?(?i:Conclusions?|Summary)\s*$", "conclusion"),
            (r"^\s*(?:7\s*\.?\s*)?(?i:Limitations?|Future\s+Work)\s*$", "limitations"),
            (r"^\s*(?i:Appendix|Appendices)\s*$", "appendix"),
        ]
        .into_iter()
        .map(|(pattern, name)| (Regex::new(pattern).expect("static section regex"), name))
        .collect()
    })
}

/// Segment paper text into sections. Text before the first recognised
/// heading is not part of any section.
pub fn segment_paper(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current_name: Option<&'static str> = None;
    let mut current_start = 0usize;
    let mut current_lines: Vec<&str> = Vec::new();

    let mut offset = 0usize;
    for line in text.split('\n') {
        let line_start = offset;
        offset += line.len() + 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current_lines.is_empty() {
                current_lines.push(line);
            }
            continue;
        }

        let matched = section_patterns()
            .iter()
            .find(|(re, _)| re.is_match(trimmed))
            .map(|(_, name)| *name);

        if let Some(name) = matched {
            if let (Some(current), false) = (current_name, current_lines.is_empty()) {
                let section_text = current_lines.join("\n");
                sections.push(Section {
                    name: current.to_string(),
                    start: current_start,
                    end: current_start + section_text.len(),
                    text: section_text,
                });
            }
            current_name = Some(name);
            current_start = line_start;
            current_lines = vec![line];
        } else if current_name.is_some() {
            current_lines.push(line);
        }
    }

    if let (Some(current), false) = (current_name, current_lines.is_empty()) {
        let section_text = current_lines.join("\n");
        sections.push(Section {
            name: current.to_string(),
            start: current_start,
            end: current_start + section_text.len(),
            text: section_text,
        });
    }

    sections
}

/// Text of a named section, if present
pub fn get_section_text(text: &str, section_name: &str) -> Option<String> {
    segment_paper(text)
        .into_iter()
        .find(|s| s.name == section_name)
        .map(|s| s.text)
}
