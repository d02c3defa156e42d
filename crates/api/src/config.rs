//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

use citycat_observability::{LogFormat, ParseLogFormatError};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CITYCAT_BIND_ADDR {value:?} is not a socket address: {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("CITYCAT_LOG_FORMAT: {0}")]
    InvalidLogFormat(#[from] ParseLogFormatError),
}

/// API server configuration.
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | `CITYCAT_BIND_ADDR` | `0.0.0.0:8080` | listen address |
/// | `DATABASE_URL` | unset | Postgres store when set, in-memory store otherwise |
/// | `CITYCAT_ADMIN_TOKEN` | unset | bearer token required on every route except `/health` |
/// | `CITYCAT_LOG_FORMAT` | `json` | `json` or `pretty` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub admin_token: Option<String>,
    pub log_format: LogFormat,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("CITYCAT_BIND_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidBindAddr { value, source })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|source| ConfigError::InvalidBindAddr {
                    value: DEFAULT_BIND_ADDR.to_string(),
                    source,
                })?,
        };

        let log_format = match get("CITYCAT_LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            admin_token: get("CITYCAT_ADMIN_TOKEN"),
            log_format,
        })
    }

    /// In-memory store, no auth, ephemeral port. Used by tests and local tooling.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            admin_token: None,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.admin_token, None);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("CITYCAT_ADMIN_TOKEN", "")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.admin_token, None);
    }

    #[test]
    fn invalid_values_are_startup_errors() {
        assert!(matches!(
            config(&[("CITYCAT_BIND_ADDR", "localhost")]),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            config(&[("CITYCAT_LOG_FORMAT", "xml")]),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn explicit_values_are_used() {
        let cfg = config(&[
            ("CITYCAT_BIND_ADDR", "127.0.0.1:9090"),
            ("DATABASE_URL", "postgres://citycat@localhost/citycat"),
            ("CITYCAT_ADMIN_TOKEN", "s3cret"),
            ("CITYCAT_LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9090);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://citycat@localhost/citycat"));
        assert_eq!(cfg.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }
}
