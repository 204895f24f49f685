/*
 * Responsibility
 * - Load settings from the environment (downstream URL/key, JWT secret, CORS, limits)
 * - Validate them (missing or malformed values fail startup)
 * - Decide the single downstream authority strategy for this deployment
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which credential the downstream data service sees on behalf of a caller.
///
/// Exactly one is active per deployment:
/// - `ServiceKey`: every call uses the service key; ownership is enforced by the
///   predicate this service adds to each query.
/// - `Impersonate`: each request binds a fresh downstream session to the caller's
///   own token, so the downstream row-level policy applies as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzStrategy {
    ServiceKey,
    Impersonate,
}

impl FromStr for AuthzStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service_key" | "service-key" | "service" => Ok(Self::ServiceKey),
            "impersonate" | "impersonation" | "session" => Ok(Self::Impersonate),
            _ => Err(ConfigError::Invalid("AUTHZ_STRATEGY")),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub downstream_url: Url,
    pub downstream_service_key: String,
    pub downstream_timeout: Duration,
    pub authz_strategy: AuthzStrategy,
    pub storage_bucket: String,

    pub auth_jwt_secret: String,
    pub auth_issuer: String,
    pub auth_audience: String,

    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // secrets stay out of logs
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("downstream_url", &self.downstream_url.as_str())
            .field("downstream_timeout", &self.downstream_timeout)
            .field("authz_strategy", &self.authz_strategy)
            .field("storage_bucket", &self.storage_bucket)
            .field("auth_issuer", &self.auth_issuer)
            .field("auth_audience", &self.auth_audience)
            .field("request_timeout", &self.request_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 5050,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let downstream_url = Url::parse(&required("DOWNSTREAM_URL")?)
            .map_err(|_| ConfigError::Invalid("DOWNSTREAM_URL"))?;
        if !matches!(downstream_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("DOWNSTREAM_URL"));
        }

        let downstream_service_key = required("DOWNSTREAM_SERVICE_KEY")?;

        let downstream_timeout = seconds(&lookup, "DOWNSTREAM_TIMEOUT_SECONDS", 15)?;

        let authz_strategy = match lookup("AUTHZ_STRATEGY") {
            Some(raw) => raw.parse()?,
            None => AuthzStrategy::ServiceKey,
        };

        let storage_bucket = lookup("STORAGE_BUCKET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "job-files".to_string());

        let auth_jwt_secret = required("AUTH_JWT_SECRET")?;
        let auth_issuer = required("AUTH_ISSUER")?;
        let auth_audience = required("AUTH_AUDIENCE")?;

        let request_timeout = seconds(&lookup, "REQUEST_TIMEOUT_SECONDS", 30)?;

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("MAX_UPLOAD_BYTES"))?,
            None => 10 * 1024 * 1024,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            downstream_url,
            downstream_service_key,
            downstream_timeout,
            authz_strategy,
            storage_bucket,
            auth_jwt_secret,
            auth_issuer,
            auth_audience,
            request_timeout,
            max_upload_bytes,
        })
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key) {
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::Invalid(key))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}
