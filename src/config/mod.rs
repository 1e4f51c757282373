use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default generative model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API settings
    pub gemini: GeminiConfig,
    /// Snapshot database settings
    pub storage: StorageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// HTTP request settings
    pub request: RequestConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Absent keys are reported per AI call, not at startup.
    pub api_key: Option<String>,
    /// REST endpoint root, without the `/v1beta` path
    pub base_url: String,
    /// Model name used in `models/{model}:generateContent`
    pub model: String,
}

/// Snapshot store configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite file; parent directories are created on open
    pub path: PathBuf,
    /// Pool size
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable
    Pretty,
    /// One JSON object per line
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
        };

        let storage = StorageConfig {
            path: PathBuf::from(
                env::var("GRANTBLOOM_DB_PATH")
                    .unwrap_or_else(|_| "./data/grantbloom.db".to_string()),
            ),
            max_connections: env::var("GRANTBLOOM_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: match env::var("REQUEST_TIMEOUT_MS") {
                Ok(raw) => raw.parse().map_err(|_| AppError::Config {
                    message: format!("REQUEST_TIMEOUT_MS must be a number, got '{}'", raw),
                })?,
                Err(_) => RequestConfig::default().timeout_ms,
            },
        };

        Ok(Config {
            gemini,
            storage,
            logging,
            request,
        })
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 120_000 }
    }
}
