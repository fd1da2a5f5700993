use crate::config::AppConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Parsed JSON emitted by the detection script on stdout.
///
/// The script reports "no text" conditions through sentinel values in
/// `text` rather than a separate flag: `[Image File]`, `[Video File]` and
/// the `[Unsupported ...]` prefix all mean there is nothing to analyze.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractorOutput {
    pub text: Option<String>,
    pub image: Option<String>,
    pub deepfake: Option<f64>,
    pub error: Option<String>,
}

impl ExtractorOutput {
    /// The extracted text, if it is real content rather than a sentinel.
    pub fn analyzable_text(&self) -> Option<&str> {
        let text = self.text.as_deref()?;
        if text.is_empty()
            || text == "[Image File]"
            || text == "[Video File]"
            || text.starts_with("[Unsupported")
        {
            return None;
        }
        Some(text)
    }
}

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("extractor timed out after {0:?}")]
    Timeout(Duration),

    #[error("extractor exited with status {code:?}: {stderr}")]
    ExitFailure { code: Option<i32>, stderr: String },

    #[error("failed to run extractor: {0}")]
    Io(#[from] std::io::Error),

    #[error("extractor produced invalid output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Trait for file content extraction implementations
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Extract text/image signal and a deepfake heuristic from a file
    async fn extract(&self, path: &Path, ext: &str) -> Result<ExtractorOutput, ExtractorError>;
}

/// Extractor that shells out to the detection script
/// (`<program> <script> <file-path> <extension>`).
pub struct ScriptExtractor {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptExtractor {
    pub fn new(program: String, script: PathBuf, timeout: Duration) -> Self {
        Self {
            program,
            script,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Extractor for ScriptExtractor {
    async fn extract(&self, path: &Path, ext: &str) -> Result<ExtractorOutput, ExtractorError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .arg(&self.script)
                .arg(path)
                .arg(ext)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ExtractorError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ExtractorError::ExitFailure {
                code: output.status.code(),
                stderr,
            });
        }

        let parsed = serde_json::from_slice::<ExtractorOutput>(&output.stdout)?;
        Ok(parsed)
    }
}

/// No-op extractor for development without the Python toolchain installed
pub struct NoopExtractor;

#[async_trait::async_trait]
impl Extractor for NoopExtractor {
    async fn extract(&self, _path: &Path, _ext: &str) -> Result<ExtractorOutput, ExtractorError> {
        tracing::warn!("NoopExtractor: skipping content extraction (development mode)");
        Ok(ExtractorOutput {
            text: Some("[Unsupported file type]".to_string()),
            ..Default::default()
        })
    }
}

/// Factory function to create the appropriate extractor based on config
pub fn create_extractor(config: &AppConfig) -> Arc<dyn Extractor> {
    match config.extractor_kind.to_lowercase().as_str() {
        "script" => Arc::new(ScriptExtractor::new(
            config.extractor_program.clone(),
            config.extractor_script.clone(),
            Duration::from_secs(config.extractor_timeout_secs),
        )),
        "noop" | "none" | "disabled" => Arc::new(NoopExtractor),
        other => {
            tracing::warn!("Unknown extractor kind '{}', using NoopExtractor", other);
            Arc::new(NoopExtractor)
        }
    }
}
