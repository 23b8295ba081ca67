use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::ingestion::IngestionConfig;

/// Application-level constants
pub const APP_NAME: &str = "MedRecon";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "medrecon-api";

/// Versioned API prefix, mirrors the routes exposed to provider frontends.
pub const API_PREFIX: &str = "/api/v1";

/// Public mount point for stored label images.
pub const UPLOADS_MOUNT: &str = "/uploads";

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medrecon=info,medrecon_lib=info,tower_http=info"
}

/// Get the application data directory.
/// Platform data dir (e.g. `~/.local/share/MedRecon`), or `./data` when none exists.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Process-wide settings, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_image_types: Vec<String>,
    pub tesseract_bin: PathBuf,
    pub ocr_lang: String,
    pub ocr_timeout: Duration,
    pub ocr_retries: u32,
    /// Empty means any origin (development).
    pub cors_origins: Vec<String>,
}

impl ServiceConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            bind_addr: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8000))),
            database_path: data_dir.join("medrecon.db"),
            upload_dir: data_dir.join("uploads"),
            data_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_image_types: DEFAULT_ALLOWED_IMAGE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tesseract_bin: PathBuf::from("tesseract"),
            ocr_lang: "eng".into(),
            ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
            ocr_retries: 0,
            cors_origins: Vec::new(),
        }
    }

    /// Read `MEDRECON_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("MEDRECON_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let mut config = Self::with_data_dir(data_dir);

        if let Some(v) = lookup("MEDRECON_BIND") {
            config.bind_addr = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MEDRECON_BIND",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("MEDRECON_DATABASE") {
            config.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDRECON_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDRECON_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_number("MEDRECON_MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = lookup("MEDRECON_ALLOWED_IMAGE_TYPES") {
            let types = split_list(&v);
            if types.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "MEDRECON_ALLOWED_IMAGE_TYPES",
                    value: v,
                });
            }
            config.allowed_image_types = types;
        }
        if let Some(v) = lookup("MEDRECON_TESSERACT") {
            config.tesseract_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDRECON_OCR_LANG") {
            config.ocr_lang = v;
        }
        if let Some(v) = lookup("MEDRECON_OCR_TIMEOUT_SECS") {
            let secs: u64 = parse_number("MEDRECON_OCR_TIMEOUT_SECS", &v)?;
            config.ocr_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("MEDRECON_OCR_RETRIES") {
            config.ocr_retries = parse_number("MEDRECON_OCR_RETRIES", &v)?;
        }
        if let Some(v) = lookup("MEDRECON_CORS_ORIGINS") {
            config.cors_origins = split_list(&v);
        }

        Ok(config)
    }

    /// The slice of configuration consumed by image ingestion.
    pub fn ingestion(&self) -> IngestionConfig {
        IngestionConfig {
            max_bytes: self.max_upload_bytes,
            allowed_types: self.allowed_image_types.clone(),
            sniff_content: true,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
