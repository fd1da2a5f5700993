use std::env;
use std::path::PathBuf;

/// Application configuration, built once at startup and shared through
/// `AppState` instead of being read ad hoc from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listening port (default: 8080)
    pub port: u16,

    /// SQLite connection URL (default: "sqlite://verifyai.db?mode=rwc")
    pub database_url: String,

    /// Secret used to sign session tokens
    pub jwt_secret: String,

    /// Session lifetime in hours (default: 24)
    pub session_ttl_hours: i64,

    /// Allowed CORS origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Directory for temporary uploads (default: "uploads")
    pub upload_dir: PathBuf,

    /// Maximum accepted upload body in bytes (default: 50 MB)
    pub max_upload_bytes: usize,

    /// User id assigned to uploads without an identifiable session.
    /// The migration seeds this row as a locked "guest" account.
    pub default_user_id: i64,

    /// Extractor type: "script" or "noop" (default: "script")
    pub extractor_kind: String,

    /// Interpreter used to run the extractor (default: "python3")
    pub extractor_program: String,

    /// Path to the extractor script (default: "scripts/detector.py")
    pub extractor_script: PathBuf,

    /// Hard deadline for one extractor run in seconds (default: 120)
    pub extractor_timeout_secs: u64,

    /// Hard deadline for one analysis call in seconds (default: 30)
    pub analysis_timeout_secs: u64,

    /// Gemini API key; analysis degrades to a zeroed fallback when unset
    pub gemini_api_key: Option<String>,

    /// Gemini generateContent endpoint
    pub gemini_api_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "sqlite://verifyai.db?mode=rwc".to_string(),
            jwt_secret: "secret".to_string(),
            session_ttl_hours: 24,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 50 * 1024 * 1024, // 50 MB
            default_user_id: 1,
            extractor_kind: "script".to_string(),
            extractor_program: "python3".to_string(),
            extractor_script: PathBuf::from("scripts/detector.py"),
            extractor_timeout_secs: 120,
            analysis_timeout_secs: 30,
            gemini_api_key: None,
            gemini_api_url:
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
                    .to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.session_ttl_hours),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_origins),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_bytes),

            default_user_id: env::var("DEFAULT_USER_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.default_user_id),

            extractor_kind: env::var("EXTRACTOR_KIND").unwrap_or(default.extractor_kind),

            extractor_program: env::var("EXTRACTOR_PROGRAM").unwrap_or(default.extractor_program),

            extractor_script: env::var("EXTRACTOR_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(default.extractor_script),

            extractor_timeout_secs: env::var("EXTRACTOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.extractor_timeout_secs),

            analysis_timeout_secs: env::var("ANALYSIS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.analysis_timeout_secs),

            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),

            gemini_api_url: env::var("GEMINI_API_URL").unwrap_or(default.gemini_api_url),
        }
    }

    /// Create config for development and tests (no external services)
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "dev-secret".to_string(),
            extractor_kind: "noop".to_string(),
            gemini_api_key: None,
            ..Self::default()
        }
    }
}
