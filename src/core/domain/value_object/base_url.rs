use crate::core::domain::error::ValidationError;
use std::env;
use std::sync::OnceLock;

/// Backend used when neither production mode nor an override is configured.
pub const DEVELOPMENT_DEFAULT_URL: &str = "http://141.196.166.241:8003";
/// Path the reverse proxy exposes the backend under in production.
pub const PRODUCTION_PROXY_PATH: &str = "/api";
/// Origin the proxy path is joined onto when none is configured.
pub const DEFAULT_PROXY_ORIGIN: &str = "http://localhost";

pub const ENV_PRODUCTION: &str = "BGREEN_PRODUCTION";
pub const ENV_API_URL: &str = "BGREEN_API_URL";
pub const ENV_PROXY_ORIGIN: &str = "BGREEN_PROXY_ORIGIN";

const MAX_URL_LENGTH: usize = 2083;

/// The environment-derived inputs of base URL resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub production: bool,
    pub api_url_override: Option<String>,
    pub proxy_origin: Option<String>,
}

impl EnvSettings {
    /// Reads the settings from the process environment, loading `.env` first
    /// if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            production: env::var(ENV_PRODUCTION)
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            api_url_override: non_blank(env::var(ENV_API_URL).ok()),
            proxy_origin: non_blank(env::var(ENV_PROXY_ORIGIN).ok()),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A validated backend base URL, stored without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Validates and wraps an absolute http(s) URL.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = raw.as_ref().trim();
        validate_base_url(raw)?;
        Ok(Self(raw.trim_end_matches('/').to_string()))
    }

    /// Creates a base URL without validation.
    #[allow(dead_code)]
    pub(crate) fn new_unchecked(raw: impl Into<String>) -> Self {
        Self(raw.into().trim_end_matches('/').to_string())
    }

    /// Picks the base URL by priority: production proxy path, then the
    /// explicit override, then the development default.
    pub fn resolve(settings: &EnvSettings) -> Result<Self, ValidationError> {
        if settings.production {
            let origin = settings
                .proxy_origin
                .as_deref()
                .unwrap_or(DEFAULT_PROXY_ORIGIN)
                .trim_end_matches('/');
            return Self::parse(format!("{}{}", origin, PRODUCTION_PROXY_PATH));
        }
        match settings.api_url_override.as_deref() {
            Some(url) => Self::parse(url),
            None => Self::parse(DEVELOPMENT_DEFAULT_URL),
        }
    }

    /// Resolves the base URL from the process environment once and returns
    /// the same value on every later call.
    pub fn from_process_env() -> Result<Self, ValidationError> {
        static RESOLVED: OnceLock<Result<BaseUrl, ValidationError>> = OnceLock::new();
        RESOLVED
            .get_or_init(|| {
                let resolved = Self::resolve(&EnvSettings::from_env());
                if let Ok(url) = &resolved {
                    tracing::info!(base_url = %url.as_str(), "resolved backend base URL");
                }
                resolved
            })
            .clone()
    }

    /// Appends an endpoint path (with or without a leading slash).
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates a backend base URL.
pub(crate) fn validate_base_url(url: &str) -> Result<(), ValidationError> {
    if url.is_empty() {
        return Err(ValidationError::field("base_url", "URL cannot be empty"));
    }

    if url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::Format(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        )));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::ConstraintViolation(format!(
            "Invalid scheme '{}'. Must be one of: http, https",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::field("base_url", "URL must contain a host"));
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ValidationError::ConstraintViolation(
            "Base URL cannot carry a query or fragment".to_string(),
        ));
    }

    Ok(())
}
