use crate::error::AppError;
use crate::models::{DetectionReport, NewVerificationRecord, VerificationStatus};
use crate::services::analysis::{AnalysisClient, AnalysisReport};
use crate::services::extractor::{Extractor, ExtractorOutput};
use crate::store::RecordStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One uploaded file staged on disk, waiting for detection.
pub struct UploadedFile {
    pub path: PathBuf,
    pub original_name: String,
    pub extension: String,
}

/// Sequences extraction, analysis, normalization and persistence for one
/// uploaded file.
pub struct VerificationService {
    records: RecordStore,
    extractor: Arc<dyn Extractor>,
    analyzer: Arc<dyn AnalysisClient>,
}

impl VerificationService {
    pub fn new(
        records: RecordStore,
        extractor: Arc<dyn Extractor>,
        analyzer: Arc<dyn AnalysisClient>,
    ) -> Self {
        Self {
            records,
            extractor,
            analyzer,
        }
    }

    /// Run the full detection pipeline. The staged upload is deleted on
    /// every path out of this function.
    pub async fn verify_upload(
        &self,
        upload: UploadedFile,
        user_id: i64,
    ) -> Result<DetectionReport, AppError> {
        let extraction = match self
            .extractor
            .extract(&upload.path, &upload.extension)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                remove_upload(&upload.path).await;
                return Err(AppError::Extraction(e.to_string()));
            }
        };

        // Analysis is non-critical: a failure degrades to a zeroed report
        // instead of aborting the request.
        let analysis = match extraction.analyzable_text() {
            Some(text) => match self.analyzer.analyze(text).await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Analysis failed, substituting zeroed result: {}", e);
                    Some(AnalysisReport::unavailable())
                }
            },
            None => None,
        };

        let report = build_report(&extraction, analysis.as_ref());

        let record = NewVerificationRecord {
            user_id,
            file_name: upload.original_name.clone(),
            upload_date: Utc::now(),
            status: report.status,
            ai_score: report.ai_score,
            human_score: report.human_score,
            deepfake_score: report.deepfake_score,
            summary: report.summary.clone(),
            detailed_explanation: report.detailed_explanation.clone(),
            metadata_score: report.metadata_score,
            linguistic_score: report.linguistic_score,
            pixel_inconsistency_score: report.pixel_inconsistency_score,
            source_tokens: report.source.clone(),
        };

        // The caller still gets the detection result if the write fails;
        // the dedicated target lets operators alert on silent data loss.
        match self.records.insert(record).await {
            Ok(stored) => info!(
                record_id = stored.id,
                user_id, "verification record stored"
            ),
            Err(e) => error!(
                target: "verifyai::persistence",
                user_id,
                file_name = %upload.original_name,
                error = %e,
                "failed to store verification record"
            ),
        }

        remove_upload(&upload.path).await;

        Ok(report)
    }
}

/// Collapse the raw extractor and analysis outputs into the complete
/// response shape: missing numeric fields become 0 (clamped to [0, 100]),
/// missing text fields stay null.
fn build_report(
    extraction: &ExtractorOutput,
    analysis: Option<&AnalysisReport>,
) -> DetectionReport {
    let ai_score = score(analysis.and_then(|a| a.ai_percentage));
    let deepfake_score = score(extraction.deepfake);

    DetectionReport {
        text_extracted: extraction.text.clone(),
        ai_score,
        human_score: score(analysis.and_then(|a| a.human_percentage)),
        deepfake_score,
        image_analysis: extraction.image.clone(),
        summary: analysis.and_then(|a| a.summary.clone()),
        detailed_explanation: analysis.and_then(|a| {
            a.detailed_explanation
                .clone()
                .or_else(|| a.analysis_details.clone())
        }),
        metadata_score: score(analysis.and_then(|a| a.metadata_score)),
        linguistic_score: score(analysis.and_then(|a| a.linguistic_score)),
        pixel_inconsistency_score: score(analysis.and_then(|a| a.pixel_inconsistency_score)),
        source: analysis.and_then(|a| a.source_text()),
        status: determine_status(ai_score, deepfake_score),
    }
}

fn score(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).clamp(0.0, 100.0)
}

/// Derive the overall verdict from the two headline scores. The deepfake
/// check short-circuits and takes priority over the AI-score bands.
pub fn determine_status(ai_score: f64, deepfake_score: f64) -> VerificationStatus {
    if deepfake_score > 50.0 {
        return VerificationStatus::Deepfake;
    }
    if ai_score < 70.0 {
        VerificationStatus::Pending
    } else if ai_score >= 90.0 {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Completed
    }
}

async fn remove_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("failed to remove staged upload {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::AnalysisError;
    use crate::services::extractor::ExtractorError;
    use sqlx::sqlite::SqlitePoolOptions;

    struct StubExtractor {
        output: Option<ExtractorOutput>, // None => hard failure
    }

    #[async_trait::async_trait]
    impl Extractor for StubExtractor {
        async fn extract(
            &self,
            _path: &Path,
            _ext: &str,
        ) -> Result<ExtractorOutput, ExtractorError> {
            self.output
                .clone()
                .ok_or_else(|| ExtractorError::ExitFailure {
                    code: Some(1),
                    stderr: "boom".to_string(),
                })
        }
    }

    struct StubAnalyzer {
        report: Option<AnalysisReport>, // None => service failure
    }

    #[async_trait::async_trait]
    impl AnalysisClient for StubAnalyzer {
        async fn analyze(&self, _text: &str) -> Result<AnalysisReport, AnalysisError> {
            self.report.clone().ok_or(AnalysisError::Disabled)
        }
    }

    async fn service(
        extractor: StubExtractor,
        analyzer: StubAnalyzer,
    ) -> (VerificationService, RecordStore) {
        // one connection: each pooled :memory: connection is its own db
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let store = RecordStore::new(pool);
        (
            VerificationService::new(store.clone(), Arc::new(extractor), Arc::new(analyzer)),
            store,
        )
    }

    fn staged_upload(dir: &tempfile::TempDir) -> UploadedFile {
        let path = dir.path().join("staged.txt");
        std::fs::write(&path, b"some text").unwrap();
        UploadedFile {
            path,
            original_name: "essay.txt".to_string(),
            extension: "txt".to_string(),
        }
    }

    #[test]
    fn test_status_derivation() {
        // deepfake check wins over the AI-score bands
        assert_eq!(determine_status(95.0, 60.0), VerificationStatus::Deepfake);
        assert_eq!(determine_status(65.0, 0.0), VerificationStatus::Pending);
        assert_eq!(determine_status(95.0, 10.0), VerificationStatus::Verified);
        assert_eq!(determine_status(80.0, 10.0), VerificationStatus::Completed);
    }

    #[test]
    fn test_build_report_defaults_missing_fields() {
        let extraction = ExtractorOutput {
            text: Some("[Image File]".to_string()),
            image: Some("portrait (91.00%)".to_string()),
            deepfake: None,
            error: None,
        };
        let report = build_report(&extraction, None);
        assert_eq!(report.ai_score, 0.0);
        assert_eq!(report.deepfake_score, 0.0);
        assert_eq!(report.linguistic_score, 0.0);
        assert!(report.summary.is_none());
        assert_eq!(report.status, VerificationStatus::Pending);
    }

    #[test]
    fn test_build_report_clamps_out_of_range_scores() {
        let analysis = AnalysisReport {
            ai_percentage: Some(250.0),
            human_percentage: Some(-10.0),
            ..Default::default()
        };
        let report = build_report(&ExtractorOutput::default(), Some(&analysis));
        assert_eq!(report.ai_score, 100.0);
        assert_eq!(report.human_score, 0.0);
    }

    #[tokio::test]
    async fn test_extractor_failure_cleans_up_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let upload = staged_upload(&dir);
        let path = upload.path.clone();

        let (svc, store) = service(
            StubExtractor { output: None },
            StubAnalyzer { report: None },
        )
        .await;

        let result = svc.verify_upload(upload, 1).await;
        assert!(matches!(result, Err(AppError::Extraction(_))));
        assert!(!path.exists());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_failure_degrades_and_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let upload = staged_upload(&dir);
        let path = upload.path.clone();

        let (svc, store) = service(
            StubExtractor {
                output: Some(ExtractorOutput {
                    text: Some("real essay text".to_string()),
                    ..Default::default()
                }),
            },
            StubAnalyzer { report: None },
        )
        .await;

        let report = svc.verify_upload(upload, 1).await.unwrap();
        assert_eq!(report.ai_score, 0.0);
        assert_eq!(report.human_score, 0.0);
        assert!(report.detailed_explanation.is_some());
        assert_eq!(report.status, VerificationStatus::Pending);
        assert!(!path.exists());

        let stored = store.list_by_user(1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, VerificationStatus::Pending);
    }

    #[tokio::test]
    async fn test_sentinel_text_skips_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let upload = staged_upload(&dir);

        // Analyzer would return a report, but the sentinel must keep it
        // from being called at all.
        let (svc, _store) = service(
            StubExtractor {
                output: Some(ExtractorOutput {
                    text: Some("[Image File]".to_string()),
                    deepfake: Some(71.4),
                    ..Default::default()
                }),
            },
            StubAnalyzer {
                report: Some(AnalysisReport {
                    ai_percentage: Some(99.0),
                    ..Default::default()
                }),
            },
        )
        .await;

        let report = svc.verify_upload(upload, 1).await.unwrap();
        assert_eq!(report.ai_score, 0.0);
        assert_eq!(report.deepfake_score, 71.4);
        assert_eq!(report.status, VerificationStatus::Deepfake);
    }

    #[tokio::test]
    async fn test_successful_analysis_persists_scores() {
        let dir = tempfile::tempdir().unwrap();
        let upload = staged_upload(&dir);

        let (svc, store) = service(
            StubExtractor {
                output: Some(ExtractorOutput {
                    text: Some("real essay text".to_string()),
                    ..Default::default()
                }),
            },
            StubAnalyzer {
                report: Some(AnalysisReport {
                    ai_percentage: Some(95.0),
                    human_percentage: Some(5.0),
                    summary: Some("almost certainly AI".to_string()),
                    linguistic_score: Some(88.0),
                    ..Default::default()
                }),
            },
        )
        .await;

        let report = svc.verify_upload(upload, 1).await.unwrap();
        assert_eq!(report.status, VerificationStatus::Verified);

        let stored = store.list_by_user(1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].ai_score, 95.0);
        assert_eq!(stored[0].linguistic_score, 88.0);
        assert_eq!(stored[0].file_name, "essay.txt");
    }
}
