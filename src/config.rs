use crate::error::{AppError, Result};

pub const STATS_API_URL: &str = "https://statsapi.mlb.com";
pub const SMTP_HOST: &str = "smtp.gmail.com";
pub const SMTP_PORT: u16 = 465;

/// MLB sport id used for every provider query.
pub const MLB_SPORT_ID: u32 = 1;

/// Timeout applied to every stats provider request (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Files loaded into the environment before `Config::from_env`, first match wins per key.
pub const ENV_FILES: &[&str] = &["config.env", ".env"];

/// Object key suffixes for the per-phase run logs.
pub mod log_keys {
    pub const UPDATED: &str = "updated_games";
    pub const PREPARED: &str = "prepared_games";
}

#[derive(Debug, Clone)]
pub struct Config {
    pub stats_api_url: String,
    pub log_level: String,
    /// Emit tracing output as JSON lines (LOG_FORMAT=json)
    pub log_json: bool,
    pub api_port: u16,
    /// Postgres connection string (PSQL_CONNECTION_STRING)
    pub database_url: String,
    /// Target table for game rows (MLB_DB_TABLE_NAME)
    pub table_name: String,
    pub storage: StorageConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3_BUCKET_NAME
    pub bucket: String,
    /// LOGS_ACCESS_KEY_ID
    pub access_key_id: String,
    /// LOGS_SECRET_ACCESS_KEY
    pub secret_access_key: String,
    /// LOGS_ENDPOINT_URL, unset means the AWS default endpoint
    pub endpoint_url: Option<String>,
    /// LOGS_REGION
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from: String,
    pub password: String,
    pub to: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Config {
    /// Loads `config.env` / `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        for file in ENV_FILES {
            dotenvy::from_filename(file).ok();
        }

        Ok(Self {
            stats_api_url: std::env::var("STATS_API_URL")
                .unwrap_or_else(|_| STATS_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            database_url: required("PSQL_CONNECTION_STRING")?,
            table_name: validate_table_name(&required("MLB_DB_TABLE_NAME")?)?,
            storage: StorageConfig {
                bucket: required("S3_BUCKET_NAME")?,
                access_key_id: required("LOGS_ACCESS_KEY_ID")?,
                secret_access_key: required("LOGS_SECRET_ACCESS_KEY")?,
                endpoint_url: std::env::var("LOGS_ENDPOINT_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                region: std::env::var("LOGS_REGION").unwrap_or_else(|_| "auto".to_string()),
            },
            email: EmailConfig {
                from: required("MLB_GAMES_EMAIL_FROM")?,
                password: required("MLB_GAMES_EMAIL_PASSWORD")?,
                to: required("MLB_GAMES_EMAIL_TO")?,
                smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| SMTP_HOST.to_string()),
                smtp_port: std::env::var("SMTP_PORT")
                    .ok()
                    .map(|p| {
                        p.parse::<u16>().map_err(|_| {
                            AppError::Config("SMTP_PORT must be a valid port number".to_string())
                        })
                    })
                    .transpose()?
                    .unwrap_or(SMTP_PORT),
            },
        })
    }
}

fn required(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Config(format!("{key} must be set"))),
    }
}

/// The table name is interpolated into SQL, so only plain (optionally
/// schema-qualified) identifiers are accepted.
pub fn validate_table_name(name: &str) -> Result<String> {
    let name = name.trim();
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|p| valid_part(p)) {
        Ok(name.to_string())
    } else {
        Err(AppError::Config(format!(
            "MLB_DB_TABLE_NAME is not a valid identifier: {name:?}"
        )))
    }
}
