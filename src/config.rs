use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Upstream forum site
    pub upstream_base_url: String,
    pub fetch_timeout: Duration,
    pub request_delay: Duration,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Upstream forum site
            upstream_base_url: trim_trailing_slash(&env_or_default(
                "UPSTREAM_BASE_URL",
                "https://assbbs.com",
            )),
            fetch_timeout: Duration::from_secs(parse_env_u64("FETCH_TIMEOUT_SECS", 10)?),
            request_delay: Duration::from_millis(parse_env_u64("REQUEST_DELAY_MS", 300)?),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "UPSTREAM_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if !self.upstream_base_url.starts_with("http://")
            && !self.upstream_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                name: "UPSTREAM_BASE_URL".to_string(),
                message: "must be an http(s) URL".to_string(),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "FETCH_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            upstream_base_url: "https://forum.example".to_string(),
            fetch_timeout: Duration::from_secs(10),
            request_delay: Duration::from_millis(300),
            web_host: "127.0.0.1".to_string(),
            web_port: 8080,
        }
    }

    #[test]
    fn test_trim_trailing_slash() {
        assert_eq!(trim_trailing_slash("https://a.example/"), "https://a.example");
        assert_eq!(trim_trailing_slash("https://a.example"), "https://a.example");
    }

    #[test]
    fn test_validate_accepts_base_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = base_config();
        config.upstream_base_url = "ftp://forum.example".to_string();
        assert!(config.validate().is_err());

        config.upstream_base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = base_config();
        config.fetch_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_defaults() {
        assert_eq!(parse_env_u64("NONEXISTENT_VAR", 42).unwrap(), 42);
        assert_eq!(parse_env_u16("NONEXISTENT_VAR", 8080).unwrap(), 8080);
    }
}
