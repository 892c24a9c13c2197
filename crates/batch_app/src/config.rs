use std::fs;
use std::path::{Path, PathBuf};

use batch_engine::{DescriberSettings, PipelineSettings};
use batch_logging::{batch_info, batch_warn};
use serde::{Deserialize, Serialize};

/// On-disk application configuration (`mediabatch.ron`).
///
/// Loading is lenient: a missing or malformed file falls back to the
/// defaults with a logged warning, so a broken config never blocks a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    /// Remote worker endpoint. `None` selects local mode.
    pub endpoint: Option<String>,
    /// Shared authenticity token sent with every worker request.
    pub token: String,
    /// Image library directory for local mode.
    pub library: PathBuf,
    pub pipeline: PipelineSettings,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AiConfig {
    pub api_key: String,
    pub model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: "local".to_string(),
            library: PathBuf::from("./library"),
            pipeline: PipelineSettings::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DescriberSettings::default().model,
        }
    }
}

pub(crate) fn load(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            batch_info!("No configuration at {:?}, using defaults", path);
            return AppConfig::default();
        }
        Err(err) => {
            batch_warn!("Failed to read configuration {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            batch_warn!("Failed to parse configuration {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("absent.ron"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediabatch.ron");
        fs::write(&path, "(((").unwrap();
        assert_eq!(load(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_omitted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediabatch.ron");
        fs::write(
            &path,
            r#"(endpoint: Some("http://worker.example/api"), token: "s3cret")"#,
        )
        .unwrap();

        let config = load(&path);
        assert_eq!(config.endpoint.as_deref(), Some("http://worker.example/api"));
        assert_eq!(config.token, "s3cret");
        assert_eq!(config.pipeline, PipelineSettings::default());
    }

    #[test]
    fn full_round_trip_through_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediabatch.ron");
        let mut config = AppConfig::default();
        config.pipeline.jpeg_quality = 70;
        config.pipeline.enable_ai_alt = true;
        config.ai.api_key = "key".to_string();

        let pretty = ron::ser::PrettyConfig::new();
        fs::write(&path, ron::ser::to_string_pretty(&config, pretty).unwrap()).unwrap();
        assert_eq!(load(&path), config);
    }
}
