use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::licence::editing::RequestVariant;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub editing: EditingConfig,
    pub storage: StorageConfig,
    pub files: FileConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let auth = AuthConfig {
            token_url: var_or("IMS_TOKEN_URL", "https://ims-na1.adobelogin.com/ims/token/v1"),
            client_id: env::var("CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("CLIENT_SECRET").unwrap_or_default(),
            scope: var_or("IMS_SCOPE", "openid,AdobeID,read_organizations"),
            safety_margin: Duration::from_secs(parse_var("TOKEN_SAFETY_MARGIN_SECS", 300)?),
        };

        let variant_raw = var_or("EDIT_REQUEST_VARIANT", "document-operations");
        let request_variant = RequestVariant::from_str(&variant_raw)
            .map_err(|_| ConfigError::InvalidVariant(variant_raw.clone()))?;

        let poll_interval = Duration::from_secs(parse_var("POLL_INTERVAL_SECS", 5)?);
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidNumber {
                key: "POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let editing = EditingConfig {
            api_url: var_or("EDITING_API_URL", "https://image.adobe.io"),
            api_key: env::var("EDITING_API_KEY").unwrap_or_default(),
            export_url: var_or("EXPORT_API_URL", "https://image.adobe.io/export"),
            request_variant,
            poll_interval,
            poll_timeout: Duration::from_secs(parse_var("POLL_TIMEOUT_SECS", 300)?),
            template_path: var_or("TEMPLATE_PATH", "/templates/licence.psd"),
            output_path: var_or("OUTPUT_PATH", "/renders/licence.psd"),
            output_mime_type: var_or("OUTPUT_MIME_TYPE", "vnd.adobe.photoshop"),
        };

        let storage = StorageConfig {
            api_url: var_or("STORAGE_API_URL", "https://api.dropboxapi.com"),
            content_url: var_or("STORAGE_CONTENT_URL", "https://content.dropboxapi.com"),
            access_token: env::var("STORAGE_ACCESS_TOKEN").unwrap_or_default(),
            upload_folder: var_or("STORAGE_UPLOAD_FOLDER", "/uploads"),
        };

        let files = FileConfig {
            stock_photo_dir: PathBuf::from(var_or("STOCK_PHOTO_DIR", "passport_photo")),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "uploads")),
            responses_dir: PathBuf::from(var_or("RESPONSES_DIR", "responses")),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth,
            editing,
            storage,
            files,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidNumber { key, value: raw })
        }
        _ => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// OAuth client-credentials settings for the editing service.
#[derive(Clone)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub safety_margin: Duration,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("safety_margin", &self.safety_margin)
            .finish_non_exhaustive()
    }
}

/// Remote editing endpoints, template locations, and polling bounds.
#[derive(Debug, Clone)]
pub struct EditingConfig {
    pub api_url: String,
    pub api_key: String,
    pub export_url: String,
    pub request_variant: RequestVariant,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub template_path: String,
    pub output_path: String,
    pub output_mime_type: String,
}

/// Cloud storage endpoints used to stage assets for the editing service.
#[derive(Clone)]
pub struct StorageConfig {
    pub api_url: String,
    pub content_url: String,
    pub access_token: String,
    pub upload_folder: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .field("upload_folder", &self.upload_folder)
            .finish_non_exhaustive()
    }
}

/// Local directories for stock photos, in-flight signatures, and archived results.
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub stock_photo_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub responses_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidVariant(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer (got '{value}')")
            }
            ConfigError::InvalidVariant(value) => write!(
                f,
                "EDIT_REQUEST_VARIANT must be one of text, document-operations, operations (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidVariant(_) => None,
        }
    }
}
