use std::sync::Arc;

use batch_logging::{batch_debug, batch_warn};
use serde::{Deserialize, Serialize};

use crate::filename::title_slug;
use crate::store::{ImageMetadata, ImageRecord, MediaStore};
use crate::{
    Codec, CodecError, CompressOutcome, DescribeFailure, Describer, LogKind, LogMessage, Prompt,
};

/// Everything that decides what the pipeline does to one image. Passed
/// in explicitly so a batch's behavior is fully determined by its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub enable_compression: bool,
    pub jpeg_quality: u8,
    pub enable_ai_title: bool,
    pub enable_ai_alt: bool,
    pub enable_ai_caption: bool,
    pub overwrite_title: bool,
    pub overwrite_alt: bool,
    pub overwrite_caption: bool,
    pub enable_rename: bool,
    /// Output language for generated metadata.
    pub language: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            enable_compression: true,
            jpeg_quality: 85,
            enable_ai_title: false,
            enable_ai_alt: false,
            enable_ai_caption: false,
            overwrite_title: false,
            overwrite_alt: true,
            overwrite_caption: false,
            enable_rename: true,
            language: "English".to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn any_ai_enabled(&self) -> bool {
        self.enable_ai_title || self.enable_ai_alt || self.enable_ai_caption
    }
}

/// The ordered, best-effort, per-image step sequence: compression, AI
/// metadata generation, metadata write, rename. Each sub-step failure is
/// absorbed into a log entry; it never aborts the remaining sub-steps or
/// the remaining images in the page.
pub struct ImagePipeline {
    settings: PipelineSettings,
    codec: Arc<dyn Codec>,
    describer: Option<Arc<dyn Describer>>,
}

impl ImagePipeline {
    pub fn new(
        settings: PipelineSettings,
        codec: Arc<dyn Codec>,
        describer: Option<Arc<dyn Describer>>,
    ) -> Self {
        Self {
            settings,
            codec,
            describer,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs every enabled step over one image, appending one log line per
    /// notable outcome.
    pub async fn run(
        &self,
        store: &dyn MediaStore,
        record: &ImageRecord,
        log: &mut Vec<LogMessage>,
    ) {
        if self.settings.enable_compression {
            self.compress_step(record, log);
        }

        let generated = if self.settings.any_ai_enabled() {
            self.describe_step(store, record, log).await
        } else {
            ImageMetadata::default()
        };

        let merged = self.merge_metadata(&record.metadata, generated);
        if merged != record.metadata {
            match store.write_metadata(record, &merged) {
                Ok(()) => log.push(LogMessage::new(
                    LogKind::Success,
                    format!("ID {}: metadata updated", record.id),
                )),
                Err(err) => {
                    batch_warn!("metadata write failed for image {}: {err}", record.id);
                    log.push(LogMessage::new(
                        LogKind::Error,
                        format!("ID {}: metadata write failed: {err}", record.id),
                    ));
                }
            }
        }

        if self.settings.enable_rename {
            self.rename_step(store, record, &merged, log);
        }
    }

    fn compress_step(&self, record: &ImageRecord, log: &mut Vec<LogMessage>) {
        match self
            .codec
            .compress(&record.path, self.settings.jpeg_quality)
        {
            Ok(CompressOutcome::Recompressed {
                original_bytes,
                new_bytes,
            }) => log.push(LogMessage::new(
                LogKind::Success,
                format!(
                    "ID {}: compressed {original_bytes} -> {new_bytes} bytes",
                    record.id
                ),
            )),
            Ok(CompressOutcome::AlreadyOptimal { .. }) => log.push(LogMessage::new(
                LogKind::Notice,
                format!("ID {}: already compressed", record.id),
            )),
            Err(CodecError::Unsupported { mime }) => log.push(LogMessage::new(
                LogKind::Notice,
                format!("ID {}: compression skipped ({mime} not supported)", record.id),
            )),
            Err(err) => {
                batch_warn!("compression failed for image {}: {err}", record.id);
                log.push(LogMessage::new(
                    LogKind::Error,
                    format!("ID {}: compression failed: {err}", record.id),
                ));
            }
        }
    }

    async fn describe_step(
        &self,
        store: &dyn MediaStore,
        record: &ImageRecord,
        log: &mut Vec<LogMessage>,
    ) -> ImageMetadata {
        let mut generated = ImageMetadata::default();

        let Some(describer) = self.describer.as_deref() else {
            // Configuration error: absorbed per image, never halts the job.
            log.push(LogMessage::new(
                LogKind::Notice,
                format!(
                    "ID {}: AI generation enabled but no model is configured",
                    record.id
                ),
            ));
            return generated;
        };

        let bytes = match store.read_bytes(record) {
            Ok(bytes) => bytes,
            Err(err) => {
                log.push(LogMessage::new(
                    LogKind::Error,
                    format!("ID {}: could not load image for AI analysis: {err}", record.id),
                ));
                return generated;
            }
        };

        let language = self.settings.language.as_str();
        let fields: [(bool, Prompt, &str); 3] = [
            (self.settings.enable_ai_title, Prompt::title(language), "title"),
            (self.settings.enable_ai_alt, Prompt::alt_text(language), "alt text"),
            (self.settings.enable_ai_caption, Prompt::caption(language), "caption"),
        ];

        for (enabled, prompt, label) in fields {
            if !enabled {
                continue;
            }
            match describer.describe(&bytes, &record.mime, &prompt).await {
                Ok(text) => {
                    batch_debug!("image {}: generated {label}", record.id);
                    match label {
                        "title" => generated.title = Some(text),
                        "alt text" => generated.alt = Some(text),
                        _ => generated.caption = Some(text),
                    }
                }
                Err(err) => {
                    let kind = match err.kind {
                        // The model declining is expected noise, not a fault.
                        DescribeFailure::Blocked | DescribeFailure::Empty => LogKind::Notice,
                        _ => LogKind::Error,
                    };
                    log.push(LogMessage::new(
                        kind,
                        format!("ID {}: {label} generation failed: {err}", record.id),
                    ));
                }
            }
        }

        generated
    }

    /// Applies the per-field overwrite policy: a generated value lands
    /// only in empty fields unless its overwrite flag is set.
    fn merge_metadata(&self, existing: &ImageMetadata, generated: ImageMetadata) -> ImageMetadata {
        fn pick(
            existing: &Option<String>,
            generated: Option<String>,
            overwrite: bool,
        ) -> Option<String> {
            let empty = existing
                .as_deref()
                .is_none_or(|value| value.trim().is_empty());
            match generated {
                Some(value) if empty || overwrite => Some(value),
                _ => existing.clone(),
            }
        }

        ImageMetadata {
            title: pick(&existing.title, generated.title, self.settings.overwrite_title),
            alt: pick(&existing.alt, generated.alt, self.settings.overwrite_alt),
            caption: pick(
                &existing.caption,
                generated.caption,
                self.settings.overwrite_caption,
            ),
        }
    }

    fn rename_step(
        &self,
        store: &dyn MediaStore,
        record: &ImageRecord,
        merged: &ImageMetadata,
        log: &mut Vec<LogMessage>,
    ) {
        let Some(title) = merged.title.as_deref().filter(|t| !t.trim().is_empty()) else {
            batch_debug!("image {}: no title available, skipping rename", record.id);
            return;
        };

        let stem = title_slug(title, record.id);
        let current_stem = record
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        if stem == current_stem {
            return;
        }

        match store.rename(record, &stem) {
            Ok(new_path) => log.push(LogMessage::new(
                LogKind::Success,
                format!("ID {}: renamed to {}", record.id, new_path.display()),
            )),
            Err(err) => {
                batch_warn!("rename failed for image {}: {err}", record.id);
                log.push(LogMessage::new(
                    LogKind::Error,
                    format!("ID {}: rename failed: {err}", record.id),
                ));
            }
        }
    }
}
