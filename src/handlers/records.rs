use crate::AppState;
use crate::error::AppError;
use crate::models::{NewVerificationRecord, VerificationRecord, VerificationStatus};
use crate::services::verification::determine_status;
use crate::utils::session::Claims;
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct RecordListResponse {
    pub success: bool,
    pub data: Vec<VerificationRecord>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordCreatedResponse {
    pub success: bool,
    pub data: VerificationRecord,
}

/// Caller-supplied record for `POST /api/user/create`, bypassing the
/// detection pipeline. Scores default to 0; a missing status is derived
/// from the supplied scores.
#[derive(Deserialize, ToSchema)]
pub struct CreateRecordRequest {
    pub file_name: String,
    pub status: Option<VerificationStatus>,
    #[serde(default)]
    pub ai_score: f64,
    #[serde(default)]
    pub human_score: f64,
    #[serde(default)]
    pub deepfake_score: f64,
    pub summary: Option<String>,
    pub detailed_explanation: Option<String>,
    #[serde(default)]
    pub metadata_score: f64,
    #[serde(default)]
    pub linguistic_score: f64,
    #[serde(default)]
    pub pixel_inconsistency_score: f64,
    pub source_tokens: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/user/history",
    responses(
        (status = 200, description = "Records owned by the session user", body = RecordListResponse),
        (status = 401, description = "No identifiable session")
    ),
    tag = "records"
)]
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RecordListResponse>, AppError> {
    let data = state.records.list_by_user(claims.sub).await?;
    Ok(Json(RecordListResponse {
        success: true,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/api/user/all",
    responses(
        (status = 200, description = "Every stored record, storage order", body = RecordListResponse),
        (status = 401, description = "No identifiable session")
    ),
    tag = "records"
)]
pub async fn list_all(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<RecordListResponse>, AppError> {
    let data = state.records.list_all().await?;
    Ok(Json(RecordListResponse {
        success: true,
        data,
    }))
}

#[utoipa::path(
    post,
    path = "/api/user/create",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record stored", body = RecordCreatedResponse),
        (status = 400, description = "Missing file name"),
        (status = 401, description = "No identifiable session")
    ),
    tag = "records"
)]
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<RecordCreatedResponse>), AppError> {
    if payload.file_name.is_empty() {
        return Err(AppError::Validation("file_name is required".to_string()));
    }

    let status = payload
        .status
        .unwrap_or_else(|| determine_status(payload.ai_score, payload.deepfake_score));

    let record = NewVerificationRecord {
        user_id: claims.sub,
        file_name: payload.file_name,
        upload_date: Utc::now(),
        status,
        ai_score: payload.ai_score.clamp(0.0, 100.0),
        human_score: payload.human_score.clamp(0.0, 100.0),
        deepfake_score: payload.deepfake_score.clamp(0.0, 100.0),
        summary: payload.summary,
        detailed_explanation: payload.detailed_explanation,
        metadata_score: payload.metadata_score.clamp(0.0, 100.0),
        linguistic_score: payload.linguistic_score.clamp(0.0, 100.0),
        pixel_inconsistency_score: payload.pixel_inconsistency_score.clamp(0.0, 100.0),
        source_tokens: payload.source_tokens,
    };

    let data = state.records.insert(record).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordCreatedResponse {
            success: true,
            data,
        }),
    ))
}
