// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. A missing or
//! unusable issuer URL is fatal: the service must not serve traffic it
//! cannot authenticate.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_ISSUER_URL` | OpenID Connect issuer (realm) URL | Required |
//! | `AUTH_AUDIENCE` | Expected token audience | Unset (not checked) |
//! | `AUTH_SKIP_TLS_VERIFY` | Skip TLS verification of the key-set fetch (development only) | `false` |
//! | `AUTH_CLOCK_SKEW_SECONDS` | Leeway on `exp`/`nbf`, at most 300 | `0` |
//! | `AUTH_KEY_REFRESH_INTERVAL_SECONDS` | Periodic wholesale key-set refresh | Unset (disabled) |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `event_service_auth=info,tower_http=info` |

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const ISSUER_URL_ENV: &str = "AUTH_ISSUER_URL";
pub const AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const SKIP_TLS_VERIFY_ENV: &str = "AUTH_SKIP_TLS_VERIFY";
pub const CLOCK_SKEW_ENV: &str = "AUTH_CLOCK_SKEW_SECONDS";
pub const KEY_REFRESH_INTERVAL_ENV: &str = "AUTH_KEY_REFRESH_INTERVAL_SECONDS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "event_service_auth=info,tower_http=info";

/// Upper bound for `AUTH_CLOCK_SKEW_SECONDS`.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid issuer URL '{url}': {reason}")]
    InvalidIssuerUrl { url: String, reason: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::invalid(
                LOG_FORMAT_ENV,
                format!("expected 'json' or 'pretty', got '{other}'"),
            )),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Issuer URL, whitespace-trimmed; compared verbatim against `iss`
    pub issuer_url: String,
    pub audience: Option<String>,
    pub skip_tls_verify: bool,
    pub clock_skew: Duration,
    /// `None` keeps the key set additive for the process lifetime
    pub key_refresh_interval: Option<Duration>,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer_url = parse_issuer(vars.get(ISSUER_URL_ENV))?;

        let audience = vars
            .get(AUDIENCE_ENV)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let skip_tls_verify = match vars.get(SKIP_TLS_VERIFY_ENV) {
            Some(value) => parse_bool(SKIP_TLS_VERIFY_ENV, value)?,
            None => false,
        };

        let clock_skew = match vars.get(CLOCK_SKEW_ENV) {
            Some(value) => {
                let seconds = parse_seconds(CLOCK_SKEW_ENV, value)?;
                if seconds > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::invalid(
                        CLOCK_SKEW_ENV,
                        format!(
                            "must not exceed {} seconds, got {seconds}",
                            MAX_CLOCK_SKEW.as_secs()
                        ),
                    ));
                }
                Duration::from_secs(seconds)
            }
            None => Duration::ZERO,
        };

        let key_refresh_interval = match vars.get(KEY_REFRESH_INTERVAL_ENV) {
            Some(value) if !value.trim().is_empty() => {
                let seconds = parse_seconds(KEY_REFRESH_INTERVAL_ENV, value)?;
                if seconds == 0 {
                    return Err(ConfigError::invalid(
                        KEY_REFRESH_INTERVAL_ENV,
                        "must be greater than 0",
                    ));
                }
                Some(Duration::from_secs(seconds))
            }
            _ => None,
        };

        let host = vars
            .get(HOST_ENV)
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match vars.get(PORT_ENV) {
            Some(value) => value.trim().parse::<u16>().map_err(|e| {
                ConfigError::invalid(PORT_ENV, format!("'{value}' is not a valid port: {e}"))
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match vars.get(LOG_FORMAT_ENV) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            issuer_url,
            audience,
            skip_tls_verify,
            clock_skew,
            key_refresh_interval,
            host,
            port,
            log_format,
        })
    }

    /// `host:port` to bind the HTTP listener on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_issuer(value: Option<&String>) -> Result<String, ConfigError> {
    let issuer = value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(ISSUER_URL_ENV.to_string()))?;

    let invalid = |reason: String| ConfigError::InvalidIssuerUrl {
        url: issuer.to_string(),
        reason,
    };

    let url = Url::parse(issuer).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(issuer.to_string())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::invalid(
            name,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

fn parse_seconds(name: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|e| {
        ConfigError::invalid(
            name,
            format!("must be a non-negative integer number of seconds, got '{value}': {e}"),
        )
    })
}
