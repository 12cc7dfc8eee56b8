//! SDK configuration: hierarchical loading, validation, and the recognized
//! fields from the engine's wire/registration contract.

use std::fmt;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A step timeout at or above this value is treated as "never".
pub const NO_TIMEOUT_THRESHOLD_MILLIS: u64 = i32::MAX as u64;

/// Configuration errors raised during validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("client_id must not be empty")]
    MissingClientId,

    #[error("auth_token must not be empty")]
    MissingAuthToken,

    #[error("base_url must not be empty")]
    EmptyBaseUrl,

    #[error("port {0} out of range, must be between 1 and 65535")]
    InvalidPort(u32),

    #[error("fixed_thread_pool_size must be at least 1")]
    InvalidThreadPoolSize,

    #[error("max_submit_attempts must be at least 1")]
    InvalidMaxSubmitAttempts,

    #[error("failed to extract configuration: {0}")]
    Extraction(String),
}

/// Typed, validated configuration for a `WorkerClient`.
///
/// `auth_token` is redacted from `Debug` output; never log this struct with
/// anything other than its derived `Debug` impl.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SdkConfig {
    /// Client identifier issued by the engine.
    pub client_id: String,

    /// Shared secret used to build the bearer token.
    pub auth_token: String,

    /// Server URL, without trailing slash. May already carry a port.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Port appended to `base_url` per the composition rule in the engine
    /// transport contract (skipped for `https:` URLs or URLs that already
    /// carry a port).
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,

    /// 0 or >= `i32::MAX` disables per-step timeouts entirely.
    #[serde(default = "default_step_timeout_millis")]
    pub step_timeout_millis: u64,

    #[serde(default = "default_initial_delay_millis")]
    pub initial_delay_millis: u64,

    #[serde(default = "default_work_request_batch_size")]
    pub work_request_batch_size: u32,

    #[serde(default = "default_response_submit_batch_size")]
    pub response_submit_batch_size: u32,

    #[serde(default = "default_fixed_thread_pool_size")]
    pub fixed_thread_pool_size: usize,

    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,

    #[serde(default = "default_permanent_error_keywords")]
    pub permanent_error_keywords: Vec<String>,

    #[serde(default = "default_enable_batch_processing")]
    pub enable_batch_processing: bool,
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}
const fn default_port() -> u16 {
    9090
}
const fn default_connection_timeout_seconds() -> u64 {
    10
}
const fn default_step_timeout_millis() -> u64 {
    60_000
}
const fn default_initial_delay_millis() -> u64 {
    1_000
}
const fn default_work_request_batch_size() -> u32 {
    100
}
const fn default_response_submit_batch_size() -> u32 {
    100
}
const fn default_fixed_thread_pool_size() -> usize {
    2
}
const fn default_max_submit_attempts() -> u32 {
    10
}
fn default_permanent_error_keywords() -> Vec<String> {
    vec![
        "Invalid request, step is not in RUNNING state".to_string(),
        "please poll the latest and update".to_string(),
    ]
}
const fn default_enable_batch_processing() -> bool {
    true
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            auth_token: String::new(),
            base_url: default_base_url(),
            port: default_port(),
            connection_timeout_seconds: default_connection_timeout_seconds(),
            step_timeout_millis: default_step_timeout_millis(),
            initial_delay_millis: default_initial_delay_millis(),
            work_request_batch_size: default_work_request_batch_size(),
            response_submit_batch_size: default_response_submit_batch_size(),
            fixed_thread_pool_size: default_fixed_thread_pool_size(),
            max_submit_attempts: default_max_submit_attempts(),
            permanent_error_keywords: default_permanent_error_keywords(),
            enable_batch_processing: default_enable_batch_processing(),
        }
    }
}

impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("client_id", &self.client_id)
            .field("auth_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .field(
                "connection_timeout_seconds",
                &self.connection_timeout_seconds,
            )
            .field("step_timeout_millis", &self.step_timeout_millis)
            .field("initial_delay_millis", &self.initial_delay_millis)
            .field("work_request_batch_size", &self.work_request_batch_size)
            .field(
                "response_submit_batch_size",
                &self.response_submit_batch_size,
            )
            .field("fixed_thread_pool_size", &self.fixed_thread_pool_size)
            .field("max_submit_attempts", &self.max_submit_attempts)
            .field("permanent_error_keywords", &self.permanent_error_keywords)
            .field("enable_batch_processing", &self.enable_batch_processing)
            .finish()
    }
}

impl SdkConfig {
    /// Whether `step_timeout_millis` should be treated as "no timeout".
    #[must_use]
    pub const fn has_step_timeout(&self) -> bool {
        self.step_timeout_millis != 0 && self.step_timeout_millis < NO_TIMEOUT_THRESHOLD_MILLIS
    }

    /// Compose the full server URL per the port-appending rule: no port is
    /// appended for `https:` URLs, nor for URLs whose authority already
    /// carries an explicit `:<port>`.
    #[must_use]
    pub fn server_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');

        if base.starts_with("https:") {
            return base.to_string();
        }

        let authority = base.split("://").next_back().unwrap_or(base);
        let has_port = authority
            .rsplit_once(':')
            .is_some_and(|(_, tail)| tail.chars().all(|c| c.is_ascii_digit()) && !tail.is_empty());

        if has_port {
            base.to_string()
        } else {
            format!("{base}:{}", self.port)
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        if self.auth_token.is_empty() {
            return Err(ConfigError::MissingAuthToken);
        }
        if self.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(u32::from(self.port)));
        }
        if self.fixed_thread_pool_size == 0 {
            return Err(ConfigError::InvalidThreadPoolSize);
        }
        if self.max_submit_attempts == 0 {
            return Err(ConfigError::InvalidMaxSubmitAttempts);
        }
        Ok(())
    }
}

/// Loads and validates `SdkConfig` from defaults, an optional YAML file, and
/// environment variables (`UNMESHED_`-prefixed, highest precedence).
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the process environment plus an optional
    /// `unmeshed.yaml` file in the current directory.
    pub fn load() -> Result<SdkConfig, ConfigError> {
        let config: SdkConfig = Figment::new()
            .merge(Serialized::defaults(SdkConfig::default()))
            .merge(Yaml::file("unmeshed.yaml"))
            .merge(Env::prefixed("UNMESHED_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Extraction(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific YAML file, useful for tests and
    /// embedding hosts that manage their own config file location.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<SdkConfig, ConfigError> {
        let config: SdkConfig = Figment::new()
            .merge(Serialized::defaults(SdkConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .map_err(|e| ConfigError::Extraction(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SdkConfig {
        SdkConfig {
            client_id: "x".to_string(),
            auth_token: "y".to_string(),
            ..SdkConfig::default()
        }
    }

    #[test]
    fn validate_rejects_missing_client_id() {
        let mut config = valid_config();
        config.client_id.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingClientId)
        ));
    }

    #[test]
    fn validate_rejects_missing_auth_token() {
        let mut config = valid_config();
        config.auth_token.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingAuthToken)
        ));
    }

    #[test]
    fn validate_accepts_defaults_with_credentials() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn server_url_appends_port_when_absent() {
        let config = SdkConfig {
            base_url: "http://engine.example.com".to_string(),
            port: 8080,
            ..valid_config()
        };
        assert_eq!(config.server_url(), "http://engine.example.com:8080");
    }

    #[test]
    fn server_url_skips_port_for_https() {
        let config = SdkConfig {
            base_url: "https://engine.example.com".to_string(),
            port: 8080,
            ..valid_config()
        };
        assert_eq!(config.server_url(), "https://engine.example.com");
    }

    #[test]
    fn server_url_skips_port_when_already_present() {
        let config = SdkConfig {
            base_url: "http://engine.example.com:7070".to_string(),
            port: 8080,
            ..valid_config()
        };
        assert_eq!(config.server_url(), "http://engine.example.com:7070");
    }

    #[test]
    fn has_step_timeout_is_false_for_zero_and_max() {
        let mut config = valid_config();
        config.step_timeout_millis = 0;
        assert!(!config.has_step_timeout());
        config.step_timeout_millis = NO_TIMEOUT_THRESHOLD_MILLIS;
        assert!(!config.has_step_timeout());
        config.step_timeout_millis = 5_000;
        assert!(config.has_step_timeout());
    }

    #[test]
    fn debug_redacts_auth_token() {
        let config = valid_config();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains('y'));
        assert!(rendered.contains("<redacted>"));
    }
}
