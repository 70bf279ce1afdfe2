use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::models::{CandidateRecord, ExtractionSettings};
use super::schema_normalizer::unwrap_json_text;

/// Loosely typed refinement returned by the AI for one candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnhancementPayload {
    pub summary: Option<String>,
    pub match_score: Option<f64>,
    pub skills: Option<Vec<String>>,
    pub insight: Option<String>,
}

impl EnhancementPayload {
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        Self {
            summary: first_text(object, &["summary", "refinedSummary"]),
            match_score: ["matchScore", "score"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_f64)),
            skills: ["skills", "refinedSkills"]
                .iter()
                .find_map(|key| object.get(*key).and_then(text_list)),
            insight: first_text(object, &["insight", "aiInsight"]),
        }
    }

    /// Unparseable text yields an empty payload, so every field falls back.
    pub fn from_ai_text(raw: &str) -> Self {
        match serde_json::from_str::<Value>(unwrap_json_text(raw)) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                debug!(error = %err, "enhancement payload is not JSON");
                Self::default()
            }
        }
    }
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let text = object.get(*key)?.as_str()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

fn text_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    (!items.is_empty()).then_some(items)
}

/// Field-by-field merge. Each field is accepted or rejected on its own and the
/// base value survives whenever the payload's value is unusable.
pub fn apply_enhancement(
    base: CandidateRecord,
    payload: &EnhancementPayload,
    settings: &ExtractionSettings,
) -> CandidateRecord {
    let mut merged = base;

    if let Some(summary) = payload.summary.as_deref().map(str::trim) {
        if !summary.is_empty() {
            merged.summary = summary.to_string();
        }
    }

    if let Some(skills) = &payload.skills {
        let skills: Vec<String> = skills
            .iter()
            .map(|skill| skill.trim())
            .filter(|skill| !skill.is_empty())
            .map(str::to_string)
            .collect();
        if !skills.is_empty() {
            merged.skills = skills;
        }
    }

    match payload.match_score {
        Some(score)
            if score.is_finite()
                && (settings.enhancement_score_min..=settings.enhancement_score_max)
                    .contains(&score) =>
        {
            merged.match_score = score.round() as i64;
        }
        Some(score) => debug!(score, candidate = %merged.name, "ignoring out-of-range score"),
        None => {}
    }

    if let Some(insight) = payload.insight.as_deref().map(str::trim) {
        if !insight.is_empty() {
            merged.insight = Some(insight.to_string());
        }
    }

    merged
}

/// Runs `fetch` for every record with bounded concurrency and merges the replies.
/// Output order matches input order. A failed, timed out or cancelled fetch keeps
/// the base record.
pub async fn enhance_candidates<F, Fut>(
    records: Vec<CandidateRecord>,
    fetch: F,
    settings: &ExtractionSettings,
    cancellation_token: &CancellationToken,
) -> Vec<CandidateRecord>
where
    F: Fn(CandidateRecord) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    let limit = Duration::from_secs(settings.enhancement_timeout_secs.max(1));
    let max_concurrency = settings.enhancement_concurrency.max(1);

    stream::iter(records)
        .map(|base| {
            let request = fetch(base.clone());
            async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancellation_token.cancelled() => None,
                    result = tokio::time::timeout(limit, request) => Some(result),
                };

                match outcome {
                    Some(Ok(Ok(text))) => {
                        apply_enhancement(base, &EnhancementPayload::from_ai_text(&text), settings)
                    }
                    Some(Ok(Err(err))) => {
                        warn!(candidate = %base.name, error = %err, "enhancement failed");
                        base
                    }
                    Some(Err(_)) => {
                        warn!(
                            candidate = %base.name,
                            timeout_secs = limit.as_secs(),
                            "enhancement timed out"
                        );
                        base
                    }
                    None => {
                        warn!(candidate = %base.name, "enhancement cancelled");
                        base
                    }
                }
            }
        })
        .buffered(max_concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(name: &str) -> CandidateRecord {
        CandidateRecord {
            id: format!("candidate-{name}"),
            name: name.to_string(),
            title: "Engineer".to_string(),
            location: "Remote".to_string(),
            skills: vec!["Rust".to_string()],
            experience_description: String::new(),
            match_score: 70,
            linkedin_url: Some(format!("https://www.linkedin.com/in/{name}")),
            github_url: None,
            summary: "Original summary".to_string(),
            insight: None,
        }
    }

    #[test]
    fn out_of_range_score_keeps_base_score_but_applies_other_fields() {
        let payload = EnhancementPayload::from_value(&json!({
            "matchScore": 150,
            "summary": "Refined summary",
            "skills": ["Rust", "Tokio"]
        }));
        let merged = apply_enhancement(record("jane"), &payload, &ExtractionSettings::default());

        assert_eq!(merged.match_score, 70);
        assert_eq!(merged.summary, "Refined summary");
        assert_eq!(merged.skills, vec!["Rust", "Tokio"]);
        assert_eq!(merged.insight, None);
    }

    #[test]
    fn in_range_score_is_rounded() {
        let payload = EnhancementPayload::from_value(&json!({ "score": 85.6 }));
        let merged = apply_enhancement(record("jane"), &payload, &ExtractionSettings::default());
        assert_eq!(merged.match_score, 86);

        let payload = EnhancementPayload::from_value(&json!({ "matchScore": 59.9 }));
        let merged = apply_enhancement(record("jane"), &payload, &ExtractionSettings::default());
        assert_eq!(merged.match_score, 70);
    }

    #[test]
    fn unusable_fields_fall_back_independently() {
        let payload = EnhancementPayload::from_value(&json!({
            "summary": "   ",
            "skills": ["", 3, null],
            "matchScore": "85",
            "aiInsight": "Strong async background"
        }));
        assert_eq!(payload.summary, None);
        assert_eq!(payload.skills, None);
        assert_eq!(payload.match_score, None);

        let base = record("jane");
        let merged = apply_enhancement(base.clone(), &payload, &ExtractionSettings::default());
        assert_eq!(merged.summary, base.summary);
        assert_eq!(merged.skills, base.skills);
        assert_eq!(merged.match_score, base.match_score);
        assert_eq!(merged.insight.as_deref(), Some("Strong async background"));
    }

    #[test]
    fn from_ai_text_reads_aliases_inside_fences() {
        let raw = "Here you go:\n```json\n{\"refinedSummary\": \"Builds compilers\", \"refinedSkills\": [\"Rust\", \" \", \"LLVM\"], \"score\": 91}\n```";
        let payload = EnhancementPayload::from_ai_text(raw);

        assert_eq!(payload.summary.as_deref(), Some("Builds compilers"));
        assert_eq!(payload.skills, Some(vec!["Rust".to_string(), "LLVM".to_string()]));
        assert_eq!(payload.match_score, Some(91.0));
    }

    #[test]
    fn from_ai_text_tolerates_garbage() {
        assert_eq!(
            EnhancementPayload::from_ai_text("I could not evaluate this candidate."),
            EnhancementPayload::default()
        );
        assert_eq!(
            EnhancementPayload::from_ai_text("[\"not\", \"an\", \"object\"]"),
            EnhancementPayload::default()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn enhance_candidates_preserves_input_order() {
        let records = vec![record("a"), record("b"), record("c")];
        let delays = [("a", 30_u64), ("b", 10), ("c", 20)];

        let enhanced = enhance_candidates(
            records,
            |candidate| async move {
                let (_, delay) = delays
                    .iter()
                    .find(|(name, _)| *name == candidate.name)
                    .copied()
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(json!({ "summary": format!("Refined {}", candidate.name) }).to_string())
            },
            &ExtractionSettings::default(),
            &CancellationToken::new(),
        )
        .await;

        let summaries: Vec<&str> = enhanced.iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Refined a", "Refined b", "Refined c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_and_timeouts_keep_base_records() {
        let settings = ExtractionSettings {
            enhancement_timeout_secs: 5,
            ..ExtractionSettings::default()
        };

        let enhanced = enhance_candidates(
            vec![record("slow"), record("broken"), record("ok")],
            |candidate| async move {
                match candidate.name.as_str() {
                    "slow" => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(json!({ "summary": "too late" }).to_string())
                    }
                    "broken" => Err(anyhow::anyhow!("provider unavailable")),
                    _ => Ok(json!({ "insight": "Fast learner" }).to_string()),
                }
            },
            &settings,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(enhanced[0], record("slow"));
        assert_eq!(enhanced[1], record("broken"));
        assert_eq!(enhanced[2].insight.as_deref(), Some("Fast learner"));
    }

    #[tokio::test]
    async fn cancelled_token_keeps_every_base_record() {
        let token = CancellationToken::new();
        token.cancel();

        let records = vec![record("a"), record("b")];
        let enhanced = enhance_candidates(
            records.clone(),
            |_| async { Ok(json!({ "summary": "should not apply" }).to_string()) },
            &ExtractionSettings::default(),
            &token,
        )
        .await;

        assert_eq!(enhanced, records);
    }
}
