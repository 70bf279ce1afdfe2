use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::errors::CoreError;
use super::field_extractor::{extract_phone, guess_name};
use super::models::{
    ContactInfo, DocumentExtraction, ExtractionSettings, LinkPlatform, ResumeAnalysis,
};

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_\-]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Canonical default-shape descriptor. Conforming a value to a shape always
/// yields every field of the shape, falling back to empty defaults.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Text,
    Number,
    List(&'static Shape),
    Object(&'static [(&'static str, Shape)]),
}

pub static RESUME_ANALYSIS_SHAPE: Shape = Shape::Object(&[
    ("candidateName", Shape::Text),
    ("skills", Shape::List(&Shape::Text)),
    (
        "experience",
        Shape::List(&Shape::Object(&[
            ("title", Shape::Text),
            ("company", Shape::Text),
            ("duration", Shape::Text),
            ("description", Shape::Text),
        ])),
    ),
    (
        "education",
        Shape::List(&Shape::Object(&[
            ("degree", Shape::Text),
            ("institution", Shape::Text),
            ("year", Shape::Text),
        ])),
    ),
    ("achievements", Shape::List(&Shape::Text)),
    (
        "technicalProficiency",
        Shape::Object(&[
            ("languages", Shape::List(&Shape::Text)),
            ("frameworks", Shape::List(&Shape::Text)),
            ("tools", Shape::List(&Shape::Text)),
        ]),
    ),
    (
        "roleMatches",
        Shape::List(&Shape::Object(&[
            ("role", Shape::Text),
            ("matchPercentage", Shape::Number),
            ("reason", Shape::Text),
        ])),
    ),
    ("improvementAreas", Shape::List(&Shape::Text)),
    ("pros", Shape::List(&Shape::Text)),
    ("cons", Shape::List(&Shape::Text)),
    ("summary", Shape::Text),
    (
        "contact",
        Shape::Object(&[
            ("email", Shape::Text),
            ("phone", Shape::Text),
            ("linkedin", Shape::Text),
            ("github", Shape::Text),
            ("leetcode", Shape::Text),
            ("geeksforgeeks", Shape::Text),
        ]),
    ),
]);

impl Shape {
    pub fn default_value(&self) -> Value {
        self.conform(None)
    }

    /// Closed-schema merge: fields missing from the shape are dropped, fields of
    /// an incompatible kind fall back to the default.
    pub fn conform(&self, value: Option<&Value>) -> Value {
        match (self, value) {
            (Shape::Text, Some(Value::String(text))) => Value::String(text.trim().to_string()),
            (Shape::Text, _) => Value::String(String::new()),
            (Shape::Number, Some(Value::Number(number))) => Value::Number(number.clone()),
            (Shape::Number, _) => Value::from(0),
            (Shape::List(item), Some(Value::Array(items))) => {
                Value::Array(items.iter().filter_map(|v| item.conform_item(v)).collect())
            }
            (Shape::List(_), _) => Value::Array(Vec::new()),
            (Shape::Object(fields), value) => {
                let parsed = value.and_then(Value::as_object);
                let merged: Map<String, Value> = fields
                    .iter()
                    .map(|(name, shape)| {
                        let field = parsed.and_then(|object| object.get(*name));
                        (name.to_string(), shape.conform(field))
                    })
                    .collect();
                Value::Object(merged)
            }
        }
    }

    fn conform_item(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Shape::Text, Value::String(text)) => {
                let text = text.trim();
                (!text.is_empty()).then(|| Value::String(text.to_string()))
            }
            (Shape::Text, Value::Number(number)) => Some(Value::String(number.to_string())),
            (Shape::Text, Value::Bool(flag)) => Some(Value::String(flag.to_string())),
            (Shape::Number, Value::Number(_)) => Some(value.clone()),
            (Shape::List(_), Value::Array(_)) | (Shape::Object(_), Value::Object(_)) => {
                Some(self.conform(Some(value)))
            }
            _ => None,
        }
    }
}

/// Returns the JSON candidate inside `raw`: the first fenced block if present,
/// otherwise the outermost `{...}` span, otherwise the trimmed text.
pub fn unwrap_json_text(raw: &str) -> &str {
    if let Some(inner) = FENCE_RE.captures(raw).and_then(|captures| captures.get(1)) {
        return inner.as_str().trim();
    }

    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Strictly parses the JSON object in `raw` and conforms it to `shape`.
pub fn normalize_json(raw: &str, shape: &Shape) -> Result<Value, CoreError> {
    let unwrapped = unwrap_json_text(raw);
    let parsed: Value =
        serde_json::from_str(unwrapped).map_err(|err| CoreError::schema_parse(err, raw))?;

    if matches!(shape, Shape::Object(_)) && !parsed.is_object() {
        return Err(CoreError::schema_parse("expected a JSON object", raw));
    }

    Ok(shape.conform(Some(&parsed)))
}

/// Builds a fully-populated analysis from the AI response and the document it describes.
pub fn normalize_resume_analysis(
    raw: &str,
    extraction: &DocumentExtraction,
    settings: &ExtractionSettings,
) -> Result<ResumeAnalysis, CoreError> {
    let value = normalize_json(raw, &RESUME_ANALYSIS_SHAPE)?;
    let mut analysis: ResumeAnalysis =
        serde_json::from_value(value).map_err(|err| CoreError::schema_parse(err, raw))?;

    splice_contact(&mut analysis.contact, extraction, settings);

    if analysis.candidate_name.is_empty() {
        if let Some(name) = guess_name(&extraction.body_text) {
            tracing::debug!(name = %name, "candidate name taken from document body");
            analysis.candidate_name = name;
        }
    }

    analysis.raw_text = extraction.body_text.clone();
    analysis.extracted_links = extraction.links.clone();

    Ok(analysis)
}

/// Document-derived values only fill channels the AI left empty.
fn splice_contact(
    contact: &mut ContactInfo,
    extraction: &DocumentExtraction,
    settings: &ExtractionSettings,
) {
    let link = |platform: LinkPlatform| extraction.first_link(platform).map(|l| l.url.clone());

    fill_if_empty(
        &mut contact.email,
        link(LinkPlatform::Email).map(|url| url.trim_start_matches("mailto:").to_string()),
    );
    fill_if_empty(&mut contact.linkedin, link(LinkPlatform::LinkedIn));
    fill_if_empty(&mut contact.github, link(LinkPlatform::GitHub));
    fill_if_empty(&mut contact.leetcode, link(LinkPlatform::LeetCode));
    fill_if_empty(&mut contact.geeksforgeeks, link(LinkPlatform::GeeksForGeeks));

    if contact.phone.is_empty() {
        fill_if_empty(
            &mut contact.phone,
            extract_phone(&extraction.body_text, &settings.default_phone_country_code),
        );
    }
}

fn fill_if_empty(slot: &mut String, value: Option<String>) {
    if slot.trim().is_empty() {
        if let Some(value) = value {
            *slot = value;
        }
    }
}
