use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::document_parser::DocumentTextExtractor;
use super::enhancement;
use super::errors::CoreError;
use super::models::{
    CandidateRecord, DocumentExtraction, ExtractionSettings, ParseRequest, ResumeAnalysis,
};
use super::pdf::PdfTextExtractor;
use super::record_parser;
use super::schema_normalizer;
use super::settings_store::SettingsStore;

/// Entry point for embedding applications: one instance per process, settings
/// shared behind a lock so they can be replaced at runtime.
pub struct CoreService {
    settings_store: SettingsStore,
    settings: RwLock<ExtractionSettings>,
    documents: DocumentTextExtractor,
}

impl CoreService {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let settings_store = SettingsStore::new();
        let settings = match settings_store.load().await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load settings, using defaults");
                ExtractionSettings::default()
            }
        };

        Ok(Arc::new(Self::with_store(settings_store, settings)))
    }

    pub fn with_store(settings_store: SettingsStore, settings: ExtractionSettings) -> Self {
        Self {
            settings_store,
            settings: RwLock::new(settings.sanitized()),
            documents: DocumentTextExtractor::new(PdfTextExtractor::new()),
        }
    }

    pub async fn get_settings(&self) -> ExtractionSettings {
        self.settings.read().await.clone()
    }

    pub async fn save_settings(
        &self,
        new_settings: ExtractionSettings,
    ) -> anyhow::Result<ExtractionSettings> {
        let sanitized = new_settings.sanitized();
        self.settings_store.save(&sanitized).await?;

        let mut guard = self.settings.write().await;
        *guard = sanitized.clone();
        tracing::info!(path = %self.settings_store.path().display(), "settings saved");
        Ok(sanitized)
    }

    pub fn extract_document(
        &self,
        file_name: Option<&str>,
        file_bytes: &[u8],
    ) -> Result<DocumentExtraction, CoreError> {
        self.documents.extract(file_name, file_bytes)
    }

    /// Decodes the résumé and normalizes the AI's analysis of it in one step.
    pub async fn analyze_resume(
        &self,
        file_name: Option<&str>,
        file_bytes: &[u8],
        ai_response: &str,
    ) -> Result<ResumeAnalysis, CoreError> {
        let extraction = self.extract_document(file_name, file_bytes)?;
        self.normalize_analysis(ai_response, &extraction).await
    }

    pub async fn normalize_analysis(
        &self,
        ai_response: &str,
        extraction: &DocumentExtraction,
    ) -> Result<ResumeAnalysis, CoreError> {
        let settings = self.get_settings().await;
        schema_normalizer::normalize_resume_analysis(ai_response, extraction, &settings)
            .inspect_err(|err| {
                tracing::warn!(
                    error = %err,
                    raw = %err.raw_snippet().unwrap_or_default(),
                    "rejected AI analysis"
                )
            })
    }

    pub async fn parse_candidates(
        &self,
        text: &str,
        request: &ParseRequest,
    ) -> Vec<CandidateRecord> {
        let settings = self.get_settings().await;
        record_parser::parse_candidates(text, request, &settings)
    }

    pub async fn enhance_candidates<F, Fut>(
        &self,
        records: Vec<CandidateRecord>,
        fetch: F,
        cancellation_token: &CancellationToken,
    ) -> Vec<CandidateRecord>
    where
        F: Fn(CandidateRecord) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let settings = self.get_settings().await;
        enhancement::enhance_candidates(records, fetch, &settings, cancellation_token).await
    }
}
