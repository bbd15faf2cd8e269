//! Process configuration, read from the environment.

use chrono::Duration;
use thiserror::Error;

use albiero_observability::LogFormat;

const DEV_JWT_SECRET: &str = "albiero-dev-secret-change-me";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TOKEN_TTL: &str = "7d";
/// Longest accepted token lifetime.
const MAX_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("APP_ENV must be 'development' or 'production', got '{0}'")]
    InvalidEnvironment(String),

    #[error("PORT must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("JWT_SECRET is required in production")]
    MissingJwtSecret,

    #[error("JWT_EXPIRE must be seconds or <n>s|m|h|d, at most 365d, got '{0}'")]
    InvalidTokenTtl(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    pub fn log_format(&self) -> LogFormat {
        match self {
            Environment::Development => LogFormat::Pretty,
            Environment::Production => LogFormat::Json,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Unset means in-memory stores.
    pub database_url: Option<String>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("port", &self.port)
            .field("token_ttl", &self.token_ttl)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match var("APP_ENV").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => return Err(ConfigError::InvalidEnvironment(other.to_string())),
        };

        let port = match var("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or(ConfigError::InvalidPort(raw))?,
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => return Err(ConfigError::MissingJwtSecret),
            None => DEV_JWT_SECRET.to_string(),
        };

        let token_ttl = parse_ttl(var("JWT_EXPIRE").as_deref().unwrap_or(DEFAULT_TOKEN_TTL))?;

        Ok(Self {
            environment,
            port,
            jwt_secret,
            token_ttl,
            database_url: var("DATABASE_URL"),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Parse a token lifetime: plain seconds (`3600`) or `<n>` followed by one of
/// `s`, `m`, `h`, `d`. Lifetimes above a year are rejected so that every
/// issued expiry stays representable.
pub fn parse_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidTokenTtl(raw.to_string());
    let raw = raw.trim();

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c.to_ascii_lowercase()),
        _ => (raw, 's'),
    };
    let n: i64 = digits.parse().map_err(|_| invalid())?;
    if n <= 0 {
        return Err(invalid());
    }

    let ttl = match unit {
        's' => Duration::try_seconds(n),
        'm' => Duration::try_minutes(n),
        'h' => Duration::try_hours(n),
        'd' => Duration::try_days(n),
        _ => None,
    };
    ttl.filter(|ttl| *ttl <= Duration::days(MAX_TOKEN_TTL_DAYS))
        .ok_or_else(invalid)
}
