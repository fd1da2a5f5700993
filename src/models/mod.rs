use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A login account. Provisioned out of band; this service only reads it.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Overall verdict for one verified upload.
///
/// Derivation order matters: the deepfake check short-circuits and wins
/// over the AI-score bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum VerificationStatus {
    Pending,
    Completed,
    Verified,
    Deepfake,
}

/// A stored detection result. Insert-only: never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub id: i64,
    pub user_id: i64,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub status: VerificationStatus,
    pub ai_score: f64,
    pub human_score: f64,
    pub deepfake_score: f64,
    pub summary: Option<String>,
    pub detailed_explanation: Option<String>,
    pub metadata_score: f64,
    pub linguistic_score: f64,
    pub pixel_inconsistency_score: f64,
    pub source_tokens: Option<String>,
}

/// Row contents for a record about to be inserted (id is generated).
#[derive(Debug, Clone)]
pub struct NewVerificationRecord {
    pub user_id: i64,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub status: VerificationStatus,
    pub ai_score: f64,
    pub human_score: f64,
    pub deepfake_score: f64,
    pub summary: Option<String>,
    pub detailed_explanation: Option<String>,
    pub metadata_score: f64,
    pub linguistic_score: f64,
    pub pixel_inconsistency_score: f64,
    pub source_tokens: Option<String>,
}

/// Response body for `POST /api/detect`. Always complete: every numeric
/// field defaults to 0 and text fields to null when a stage produced
/// nothing, so clients never see a partial shape.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub text_extracted: Option<String>,
    pub ai_score: f64,
    pub human_score: f64,
    pub deepfake_score: f64,
    pub image_analysis: Option<String>,
    pub summary: Option<String>,
    pub detailed_explanation: Option<String>,
    pub metadata_score: f64,
    pub linguistic_score: f64,
    pub pixel_inconsistency_score: f64,
    pub source: Option<String>,
    pub status: VerificationStatus,
}
