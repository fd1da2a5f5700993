use crate::AppState;
use crate::error::AppError;
use crate::models::DetectionReport;
use crate::services::verification::UploadedFile;
use crate::utils::session::{SESSION_COOKIE, verify_session_token};
use axum::{Json, extract::Multipart, extract::State};
use axum_extra::extract::cookie::CookieJar;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/detect",
    request_body(content = String, description = "Multipart form with one `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Detection result", body = DetectionReport),
        (status = 400, description = "No file uploaded"),
        (status = 500, description = "Detection failed")
    ),
    tag = "detect"
)]
pub async fn detect(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Json<DetectionReport>, AppError> {
    // Identity is optional here: a verified session cookie wins, anything
    // else falls back to the configured guest identity. An unverifiable
    // cookie is never trusted for its decoded contents.
    let user_id = jar
        .get(SESSION_COOKIE)
        .and_then(|c| verify_session_token(c.value(), &state.config.jwt_secret).ok())
        .map(|claims| claims.sub)
        .unwrap_or(state.config.default_user_id);

    let upload = stage_upload(&state, multipart).await?;

    let report = state.verification.verify_upload(upload, user_id).await?;

    Ok(Json(report))
}

/// Stream the multipart `file` field to a uniquely named file under the
/// upload directory. The orchestrator owns deletion from here on.
async fn stage_upload(state: &AppState, mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("cannot create upload dir: {e}")))?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let extension = original_name
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase();

        let path = state.config.upload_dir.join(Uuid::new_v4().to_string());
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("cannot stage upload: {e}")))?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(AppError::Validation(format!("Upload aborted: {e}")));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(AppError::Internal(format!("cannot stage upload: {e}")));
            }
        }
        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("cannot stage upload: {e}")))?;

        return Ok(UploadedFile {
            path,
            original_name,
            extension,
        });
    }

    Err(AppError::Validation("No file uploaded".to_string()))
}
