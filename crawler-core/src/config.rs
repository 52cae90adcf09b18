//! Crawler configuration loaded from a TOML file.
//!
//! Every field has a default so an empty (or absent) file yields a usable
//! configuration. The session cookie may also come from `WEIBO_COOKIE`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Statuses the HTTP client retries before giving up.
const DEFAULT_RETRY_STATUSES: [u16; 5] = [403, 500, 502, 503, 504];

pub const COOKIE_ENV_VAR: &str = "WEIBO_COOKIE";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extra attempts after the first request
    pub max_retries: u32,
    /// Linear backoff unit between retries
    pub backoff_interval_ms: u64,
    /// Random extra share of each backoff delay, 0.0 to 1.0
    pub jitter_factor: f64,
    /// Fixed pause before every page request
    pub page_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub retry_statuses: Vec<u16>,
    /// Search scope code embedded in the container id (61 realtime, 1 comprehensive, 60 hot)
    pub search_type: u32,
    pub output_dir: PathBuf,
    pub cookie: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("user-agent".to_string(), DEFAULT_USER_AGENT.to_string());
        headers.insert(
            "accept".to_string(),
            "application/json, text/plain, */*".to_string(),
        );

        Self {
            max_retries: 3,
            backoff_interval_ms: 500,
            jitter_factor: 0.0,
            page_delay_ms: 100,
            request_timeout_secs: 30,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            search_type: 61,
            output_dir: PathBuf::from("search_result"),
            cookie: None,
            headers,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults, then
    /// apply environment overrides and validate.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                debug!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(cookie) = std::env::var(COOKIE_ENV_VAR) {
            if !cookie.trim().is_empty() {
                debug!("Using cookie from {}", COOKIE_ENV_VAR);
                self.cookie = Some(cookie);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidValue {
                field: "jitter_factor".to_string(),
                value: self.jitter_factor.to_string(),
            });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output_dir".to_string(),
                value: String::new(),
            });
        }
        if let Some(status) = self
            .retry_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(ConfigError::InvalidValue {
                field: "retry_statuses".to_string(),
                value: status.to_string(),
            });
        }
        for (name, value) in &self.headers {
            let valid_name = !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
            if !valid_name {
                return Err(ConfigError::InvalidValue {
                    field: "headers".to_string(),
                    value: name.clone(),
                });
            }
            if value.bytes().any(|b| b == b'\r' || b == b'\n') {
                return Err(ConfigError::InvalidValue {
                    field: format!("headers.{}", name),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Headers sent with every request, with the cookie appended when set.
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.headers.clone();
        if let Some(cookie) = self.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            headers.insert("cookie".to_string(), cookie.to_string());
        }
        headers
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.page_delay(), Duration::from_millis(100));
        assert_eq!(config.retry_statuses, vec![403, 500, 502, 503, 504]);
        assert_eq!(config.search_type, 61);
        assert!(config.headers.contains_key("user-agent"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            max_retries = 5
            jitter_factor = 0.25
            output_dir = "out"

            [headers]
            user-agent = "test-agent/1.0"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.backoff_interval_ms, 500);
        assert_eq!(config.jitter_factor, 0.25);
        assert_eq!(config.headers.get("user-agent").unwrap(), "test-agent/1.0");
        assert!(!config.headers.contains_key("accept"));
    }

    #[test]
    fn test_cookie_is_appended_to_headers() {
        let mut config = AppConfig::default();
        assert!(!config.request_headers().contains_key("cookie"));

        config.cookie = Some("SUB=abc".to_string());
        assert_eq!(config.request_headers().get("cookie").unwrap(), "SUB=abc");

        config.cookie = Some("   ".to_string());
        assert!(!config.request_headers().contains_key("cookie"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.request_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "request_timeout_secs"
        ));

        let mut config = AppConfig::default();
        config.headers.insert("bad header".to_string(), "x".to_string());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retry_statuses = vec![42];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.jitter_factor = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "jitter_factor"
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let result = AppConfig::from_toml("max_retries = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load("/definitely/not/here/weibo.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
