use std::path::{Path, PathBuf};

use anyhow::Context;

use super::models::ExtractionSettings;

pub const SETTINGS_PATH_ENV: &str = "RESUME_INTAKE_SETTINGS";

pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    /// Uses `RESUME_INTAKE_SETTINGS` when set, otherwise the per-user data directory.
    pub fn new() -> Self {
        let file_path = std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(settings_path);
        Self::new_with_path(file_path)
    }

    pub fn new_with_path(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub async fn load(&self) -> anyhow::Result<ExtractionSettings> {
        if !tokio::fs::try_exists(&self.file_path)
            .await
            .unwrap_or(false)
        {
            tracing::debug!(path = %self.file_path.display(), "no settings file, using defaults");
            return Ok(ExtractionSettings::default());
        }

        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .with_context(|| {
                format!("failed to read settings file {}", self.file_path.display())
            })?;

        let parsed = serde_json::from_str::<ExtractionSettings>(&content).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })?;

        Ok(parsed.sanitized())
    }

    pub async fn save(&self, settings: &ExtractionSettings) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.file_path, json)
            .await
            .with_context(|| {
                format!("failed to write settings file {}", self.file_path.display())
            })?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn settings_path() -> PathBuf {
    app_data_root().join("settings.json")
}

pub fn app_data_root() -> PathBuf {
    if let Some(path) = dirs::data_local_dir() {
        return path.join("ResumeIntake");
    }

    PathBuf::from(".").join("ResumeIntake")
}
