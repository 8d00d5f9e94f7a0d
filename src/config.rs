//! Configuration types for analytics-runner
//!
//! The configuration is a flat TOML file. Fields are grouped into sub-configs
//! that are flattened on (de)serialization, so the file format stays a plain
//! list of keys.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable that overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "ANALYTICS_RUNNER_CONFIG";

/// Configuration file name looked up in the working directory by default
pub const DEFAULT_CONFIG_FILE: &str = "analytics_runner.toml";

/// Longest accepted `token_lifetime_secs`
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Base URLs of the collaborating services
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceEndpoints {
    /// SSO service issuing bearer tokens
    pub sso_service_base_url: String,

    /// Data API hosting the file-management and dictionary services
    pub data_api_base_url: String,

    /// API hosting the job and project services
    pub impairment_studio_api_base_url: String,
}

/// SSO credentials
///
/// `Debug` never prints the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// SSO user id
    pub user_id: String,

    /// SSO password
    pub user_password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("user_password", &"<redacted>")
            .finish()
    }
}

/// Job polling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// How long to wait for a job to reach a terminal status (default: 60 minutes)
    #[serde(
        rename = "default_job_wait_timeout_in_minutes",
        default = "default_job_wait_timeout",
        with = "duration_minutes"
    )]
    pub job_wait_timeout: Duration,

    /// Delay between two status checks (default: 10 seconds)
    #[serde(
        rename = "poll_interval_secs",
        default = "default_poll_interval",
        with = "duration_secs"
    )]
    pub poll_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            job_wait_timeout: default_job_wait_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Session and HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime assumed for a freshly issued token (default: 15 minutes)
    #[serde(
        rename = "token_lifetime_secs",
        default = "default_token_lifetime",
        with = "duration_secs"
    )]
    pub token_lifetime: Duration,

    /// Window before expiry in which the next use renews the token (default: 60 seconds)
    #[serde(
        rename = "token_renewal_threshold_secs",
        default = "default_token_renewal_threshold",
        with = "duration_secs"
    )]
    pub token_renewal_threshold: Duration,

    /// Timeout applied to every HTTP request, uploads and downloads included (default: 300 seconds)
    #[serde(
        rename = "request_timeout_secs",
        default = "default_request_timeout",
        with = "duration_secs"
    )]
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_lifetime: default_token_lifetime(),
            token_renewal_threshold: default_token_renewal_threshold(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Optional outbound proxies, applied to every request including SSO
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy for plain HTTP traffic
    #[serde(default)]
    pub http_proxy: Option<String>,

    /// Proxy for HTTPS traffic
    #[serde(default)]
    pub https_proxy: Option<String>,
}

/// Main configuration for an analysis run
///
/// Constructed once at startup and passed by reference to every component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Service base URLs
    #[serde(flatten)]
    pub endpoints: ServiceEndpoints,

    /// SSO credentials
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Job polling settings
    #[serde(flatten)]
    pub polling: PollingConfig,

    /// Token lifetime and HTTP client settings
    #[serde(flatten)]
    pub session: SessionConfig,

    /// Outbound proxies
    #[serde(flatten)]
    pub proxy: ProxyConfig,

    /// Exit with a non-zero status when a run is terminated by an error (default: false)
    #[serde(default)]
    pub exit_with_failure_status: bool,
}

impl Config {
    /// Create a configuration with default polling, session and proxy settings
    pub fn new(endpoints: ServiceEndpoints, credentials: Credentials) -> Self {
        Self {
            endpoints,
            credentials,
            polling: PollingConfig::default(),
            session: SessionConfig::default(),
            proxy: ProxyConfig::default(),
            exit_with_failure_status: false,
        }
    }

    /// Configuration file location: `$ANALYTICS_RUNNER_CONFIG` or `./analytics_runner.toml`
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("sso_service_base_url", &self.endpoints.sso_service_base_url),
            ("data_api_base_url", &self.endpoints.data_api_base_url),
            (
                "impairment_studio_api_base_url",
                &self.endpoints.impairment_studio_api_base_url,
            ),
        ];
        for (key, value) in urls {
            Url::parse(value)
                .map_err(|e| Error::config(key, format!("'{value}' is not an absolute URL: {e}")))?;
        }

        for (key, value) in [
            ("http_proxy", &self.proxy.http_proxy),
            ("https_proxy", &self.proxy.https_proxy),
        ] {
            if let Some(proxy) = value {
                Url::parse(proxy)
                    .map_err(|e| Error::config(key, format!("'{proxy}' is not a URL: {e}")))?;
            }
        }

        if self.credentials.user_id.trim().is_empty() {
            return Err(Error::config("user_id", "must not be empty"));
        }

        if self.polling.poll_interval.is_zero() {
            return Err(Error::config("poll_interval_secs", "must be greater than zero"));
        }

        if self.session.token_lifetime.is_zero() {
            return Err(Error::config("token_lifetime_secs", "must be greater than zero"));
        }

        if self.session.token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(Error::config(
                "token_lifetime_secs",
                format!("must not exceed {} seconds", MAX_TOKEN_LIFETIME.as_secs()),
            ));
        }

        if self.session.token_renewal_threshold >= self.session.token_lifetime {
            return Err(Error::config(
                "token_renewal_threshold_secs",
                "must be shorter than the token lifetime",
            ));
        }

        Ok(())
    }
}

fn default_job_wait_timeout() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_token_lifetime() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_token_renewal_threshold() -> Duration {
    Duration::from_secs(60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

// Durations written as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Durations written as whole minutes
mod duration_minutes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs() / 60)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let minutes = u64::deserialize(deserializer)?;
        let secs = minutes
            .checked_mul(60)
            .ok_or_else(|| D::Error::custom(format!("{minutes} minutes is out of range")))?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        sso_service_base_url = "https://sso.example.com"
        data_api_base_url = "https://data.example.com"
        impairment_studio_api_base_url = "https://studio.example.com"
        user_id = "analyst"
        user_password = "s3cret"
    "#;

    #[test]
    fn minimal_file_gets_documented_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.endpoints.data_api_base_url, "https://data.example.com");
        assert_eq!(config.credentials.user_id, "analyst");
        assert_eq!(config.polling.job_wait_timeout, Duration::from_secs(3600));
        assert_eq!(config.polling.poll_interval, Duration::from_secs(10));
        assert_eq!(config.session.token_lifetime, Duration::from_secs(900));
        assert_eq!(config.session.token_renewal_threshold, Duration::from_secs(60));
        assert!(config.proxy.http_proxy.is_none());
        assert!(config.proxy.https_proxy.is_none());
        assert!(!config.exit_with_failure_status);
    }

    #[test]
    fn all_recognized_keys_are_read() {
        let content = format!(
            "{MINIMAL}
            default_job_wait_timeout_in_minutes = 5
            poll_interval_secs = 3
            token_lifetime_secs = 600
            token_renewal_threshold_secs = 30
            request_timeout_secs = 45
            http_proxy = \"http://proxy.local:3128\"
            https_proxy = \"http://proxy.local:3129\"
            exit_with_failure_status = true
            "
        );
        let config = Config::from_toml_str(&content).unwrap();

        assert_eq!(config.polling.job_wait_timeout, Duration::from_secs(300));
        assert_eq!(config.polling.poll_interval, Duration::from_secs(3));
        assert_eq!(config.session.token_lifetime, Duration::from_secs(600));
        assert_eq!(config.session.token_renewal_threshold, Duration::from_secs(30));
        assert_eq!(config.session.request_timeout, Duration::from_secs(45));
        assert_eq!(
            config.proxy.http_proxy.as_deref(),
            Some("http://proxy.local:3128")
        );
        assert_eq!(
            config.proxy.https_proxy.as_deref(),
            Some("http://proxy.local:3129")
        );
        assert!(config.exit_with_failure_status);
    }

    #[test]
    fn missing_required_key_is_a_config_error() {
        let content = MINIMAL.replace("user_password = \"s3cret\"", "");
        let err = Config::from_toml_str(&content).unwrap_err();

        match err {
            Error::Config { message, .. } => assert!(message.contains("user_password")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn relative_service_url_is_rejected_with_its_key() {
        let content = MINIMAL.replace("https://data.example.com", "data.example.com");
        let err = Config::from_toml_str(&content).unwrap_err();

        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("data_api_base_url")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn renewal_threshold_must_be_shorter_than_lifetime() {
        let content = format!(
            "{MINIMAL}
            token_lifetime_secs = 60
            token_renewal_threshold_secs = 60
            "
        );
        let err = Config::from_toml_str(&content).unwrap_err();

        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("token_renewal_threshold_secs"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn oversized_token_lifetime_is_rejected() {
        let content = format!("{MINIMAL}\ntoken_lifetime_secs = 9000000000000\n");
        let err = Config::from_toml_str(&content).unwrap_err();

        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("token_lifetime_secs")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn one_day_token_lifetime_is_accepted() {
        let content = format!("{MINIMAL}\ntoken_lifetime_secs = 86400\n");
        let config = Config::from_toml_str(&content).unwrap();
        assert_eq!(config.session.token_lifetime, MAX_TOKEN_LIFETIME);
    }

    #[test]
    fn overflowing_job_wait_minutes_is_a_config_error() {
        let content =
            format!("{MINIMAL}\ndefault_job_wait_timeout_in_minutes = 9000000000000000000\n");
        let err = Config::from_toml_str(&content).unwrap_err();

        match err {
            Error::Config { message, .. } => assert!(message.contains("out of range")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let content = format!("{MINIMAL}\npoll_interval_secs = 0\n");
        assert!(Config::from_toml_str(&content).is_err());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("analyst"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn load_reports_unreadable_file_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();

        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runner.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.endpoints.impairment_studio_api_base_url,
            "https://studio.example.com"
        );
    }
}
