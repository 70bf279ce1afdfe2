use thiserror::Error;

const RAW_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to read document: {0}")]
    DocumentRead(String),
    #[error("AI response is not valid JSON: {reason}")]
    SchemaParse { reason: String, raw: String },
}

impl CoreError {
    pub fn document_read(cause: impl Into<String>) -> Self {
        CoreError::DocumentRead(cause.into())
    }

    pub fn schema_parse(reason: impl ToString, raw: &str) -> Self {
        CoreError::SchemaParse {
            reason: reason.to_string(),
            raw: raw.to_string(),
        }
    }

    /// Bounded prefix of the offending AI text, for logs and error payloads.
    pub fn raw_snippet(&self) -> Option<String> {
        match self {
            CoreError::SchemaParse { raw, .. } => {
                let mut snippet: String = raw.chars().take(RAW_SNIPPET_CHARS).collect();
                if raw.chars().count() > RAW_SNIPPET_CHARS {
                    snippet.push_str("...");
                }
                Some(snippet)
            }
            CoreError::DocumentRead(_) => None,
        }
    }
}
