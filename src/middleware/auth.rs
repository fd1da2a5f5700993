use crate::AppState;
use crate::utils::session::{SESSION_COOKIE, verify_session_token};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

/// Requires a verified session cookie and makes the claims available to
/// handlers as a request extension. An absent, malformed, expired or
/// forged cookie is rejected outright.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let jar = CookieJar::from_headers(req.headers());

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(claims) = verify_session_token(cookie.value(), &state.config.jwt_secret) {
            req.extensions_mut().insert(claims);
            return Ok(next.run(req).await);
        }
    }

    Err(StatusCode::UNAUTHORIZED)
}
