pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use crate::config::AppConfig;
use crate::services::analysis::AnalysisClient;
use crate::services::extractor::Extractor;
use crate::services::verification::VerificationService;
use crate::store::{RecordStore, UserStore};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::detect::detect,
        handlers::records::history,
        handlers::records::list_all,
        handlers::records::create,
        handlers::health::health_check,
    ),
    components(
        schemas(
            handlers::auth::LoginRequest,
            handlers::auth::LoginResponse,
            handlers::records::RecordListResponse,
            handlers::records::RecordCreatedResponse,
            handlers::records::CreateRecordRequest,
            handlers::health::HealthResponse,
            models::DetectionReport,
            models::VerificationRecord,
            models::VerificationStatus,
        )
    ),
    tags(
        (name = "auth", description = "Login and session issuance"),
        (name = "detect", description = "Upload detection pipeline"),
        (name = "records", description = "Verification record access"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub users: UserStore,
    pub records: RecordStore,
    pub verification: Arc<VerificationService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: AppConfig,
        extractor: Arc<dyn Extractor>,
        analyzer: Arc<dyn AnalysisClient>,
    ) -> Self {
        let users = UserStore::new(db.clone());
        let records = RecordStore::new(db.clone());
        let verification = Arc::new(VerificationService::new(
            records.clone(),
            extractor,
            analyzer,
        ));

        Self {
            db,
            users,
            records,
            verification,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let require_session = from_fn_with_state(state.clone(), middleware::auth::auth_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/detect", post(handlers::detect::detect))
        .route(
            "/api/user/history",
            get(handlers::records::history).layer(require_session.clone()),
        )
        .route(
            "/api/user/all",
            get(handlers::records::list_all).layer(require_session.clone()),
        )
        .route(
            "/api/user/create",
            post(handlers::records::create).layer(require_session),
        )
        .with_state(state)
}
