use crate::AppState;
use crate::error::AppError;
use crate::utils::session::{SESSION_COOKIE, create_session_token};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user_id: i64,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required.".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid credentials.".to_string()))?;

    // Accounts seeded with an unusable hash (e.g. the guest fallback) fail
    // here and are indistinguishable from a wrong password.
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Auth("Invalid credentials.".to_string()))?;

    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Auth("Invalid credentials.".to_string()))?;

    let token = create_session_token(
        user.id,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            user_id: user.id,
        }),
    ))
}
