//! Tolerant parser for LLM-authored candidate listings.
//!
//! The input is free text of the form
//!
//! ```text
//! Candidate #1:
//! Name: Jane Doe
//! LinkedIn: https://linkedin.com/in/janedoe
//! Skills: Go, Rust, C++
//! ```
//!
//! Every block is parsed independently. A block that does not produce a valid
//! [`CandidateRecord`] is dropped; the call itself never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::link_extractor::qualified_url;
use super::models::{CandidateRecord, ExtractionSettings, LinkPlatform, ParseRequest};

static BLOCK_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t>#*_\-]*(?:candidate|entry|profile|result)[ \t]*(?:#|no\.?|number)?[ \t]*\d+\b",
    )
    .unwrap()
});

const PLACEHOLDER_TOKENS: [&str; 8] = [
    "example",
    "placeholder",
    "sample",
    "lorem",
    "your name",
    "candidate name",
    "john doe",
    "[name]",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Title,
    LinkedIn,
    GitHub,
    Experience,
    Location,
    Skills,
    Summary,
}

const FIELD_KEYS: &[(&str, Field)] = &[
    ("name", Field::Name),
    ("fullname", Field::Name),
    ("candidatename", Field::Name),
    ("title", Field::Title),
    ("jobtitle", Field::Title),
    ("currenttitle", Field::Title),
    ("role", Field::Title),
    ("currentrole", Field::Title),
    ("position", Field::Title),
    ("linkedin", Field::LinkedIn),
    ("linkedinurl", Field::LinkedIn),
    ("linkedinprofile", Field::LinkedIn),
    ("github", Field::GitHub),
    ("githuburl", Field::GitHub),
    ("githubprofile", Field::GitHub),
    ("experience", Field::Experience),
    ("yearsofexperience", Field::Experience),
    ("experiencedescription", Field::Experience),
    ("location", Field::Location),
    ("city", Field::Location),
    ("skills", Field::Skills),
    ("keyskills", Field::Skills),
    ("technicalskills", Field::Skills),
    ("summary", Field::Summary),
    ("profilesummary", Field::Summary),
    ("bio", Field::Summary),
];

#[derive(Debug, Default)]
struct PartialRecord {
    name: Option<String>,
    title: Option<String>,
    linkedin_url: Option<String>,
    github_url: Option<String>,
    experience: Option<String>,
    location: Option<String>,
    skills: Vec<String>,
    summary: Option<String>,
}

impl PartialRecord {
    fn apply(&mut self, field: Field, value: &str, settings: &ExtractionSettings) {
        match field {
            Field::Name => {
                if self.name.is_none() && is_plausible_label(value, settings.min_name_len) {
                    self.name = Some(value.to_string());
                }
            }
            Field::Title => {
                if self.title.is_none() && is_plausible_label(value, settings.min_name_len) {
                    self.title = Some(value.to_string());
                }
            }
            Field::LinkedIn => {
                if self.linkedin_url.is_none() {
                    self.linkedin_url = qualified_url(LinkPlatform::LinkedIn, value);
                }
            }
            Field::GitHub => {
                if self.github_url.is_none() {
                    self.github_url = qualified_url(LinkPlatform::GitHub, value);
                }
            }
            Field::Experience => {
                self.experience.get_or_insert_with(|| value.to_string());
            }
            Field::Location => {
                self.location.get_or_insert_with(|| value.to_string());
            }
            Field::Skills => {
                for skill in value.split(',').map(str::trim) {
                    let len = skill.chars().count();
                    if len < settings.skill_min_len || len > settings.skill_max_len {
                        continue;
                    }
                    if !self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                        self.skills.push(skill.to_string());
                    }
                }
            }
            Field::Summary => {
                if self.summary.is_none() && value.chars().count() > settings.min_summary_len {
                    self.summary = Some(value.to_string());
                }
            }
        }
    }

    fn into_record(
        self,
        request: &ParseRequest,
        settings: &ExtractionSettings,
    ) -> Option<CandidateRecord> {
        let name = self.name?;
        if self.skills.is_empty() || (self.linkedin_url.is_none() && self.github_url.is_none()) {
            return None;
        }

        let record = CandidateRecord {
            id: format!("candidate-{}", Uuid::new_v4()),
            name,
            title: self.title.unwrap_or_else(|| request.context_role.clone()),
            location: self
                .location
                .unwrap_or_else(|| request.context_location.clone()),
            skills: self.skills,
            experience_description: self.experience.unwrap_or_default(),
            match_score: settings.default_match_score,
            linkedin_url: self.linkedin_url,
            github_url: self.github_url,
            summary: self.summary.unwrap_or_default(),
            insight: None,
        };

        record.is_valid().then_some(record)
    }
}

/// Parses up to `request.max_records` valid candidates out of `text`.
pub fn parse_candidates(
    text: &str,
    request: &ParseRequest,
    settings: &ExtractionSettings,
) -> Vec<CandidateRecord> {
    let max_records = settings.clamp_max_records(request.max_records);

    let records: Vec<CandidateRecord> = split_blocks(text, settings.min_block_len)
        .into_iter()
        .enumerate()
        .filter_map(|(index, block)| {
            let record = parse_block(block, request, settings);
            if record.is_none() {
                tracing::debug!(block = index, "dropping block without a valid candidate");
            }
            record
        })
        .take(max_records)
        .collect();

    tracing::debug!(
        parsed = records.len(),
        max_records,
        "parsed candidates from freeform text"
    );
    records
}

/// Splits at every block-start marker; text ahead of the first marker is a block too.
pub fn split_blocks(text: &str, min_block_len: usize) -> Vec<&str> {
    let mut boundaries: Vec<usize> = BLOCK_START_RE
        .find_iter(text)
        .map(|m| m.start())
        .filter(|start| *start > 0)
        .collect();
    boundaries.insert(0, 0);
    boundaries.push(text.len());

    boundaries
        .windows(2)
        .map(|window| text[window[0]..window[1]].trim())
        .filter(|block| block.chars().count() >= min_block_len)
        .collect()
}

fn parse_block(
    block: &str,
    request: &ParseRequest,
    settings: &ExtractionSettings,
) -> Option<CandidateRecord> {
    let mut partial = PartialRecord::default();

    for line in block.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(field) = lookup_field(key) else {
            continue;
        };
        let value = clean_value(value);
        if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
            continue;
        }
        partial.apply(field, value, settings);
    }

    partial.into_record(request, settings)
}

fn lookup_field(raw_key: &str) -> Option<Field> {
    let key: String = raw_key
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    let key = key.trim_start_matches(|c: char| c.is_ascii_digit());

    FIELD_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, field)| *field)
}

fn clean_value(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '*' | '_' | '`'))
        .trim()
}

fn is_plausible_label(value: &str, min_len: usize) -> bool {
    if value.chars().count() <= min_len {
        return false;
    }
    let lower = value.to_lowercase();
    !PLACEHOLDER_TOKENS.iter().any(|token| lower.contains(token))
}
