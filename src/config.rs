use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,

    /// Scope for every endpoint; empty keeps routes at the root where the
    /// mobile client expects them.
    pub api_prefix: String,

    // QR decoding
    pub google_api_key: Option<String>,
    pub vision_endpoint: String,
    pub max_upload_bytes: usize,

    // Rate limiting
    pub rate_mark_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_read_per_min: u32,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            server_addr: string_or("SERVER_ADDR", "0.0.0.0:5000"),
            database_url: string_or("DATABASE_URL", "sqlite://attendance.db"),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,

            api_prefix: string_or("API_PREFIX", ""),

            google_api_key: lookup("GOOGLE_API_KEY").filter(|k| !k.trim().is_empty()),
            vision_endpoint: string_or("VISION_ENDPOINT", DEFAULT_VISION_ENDPOINT),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,

            rate_mark_per_min: parse_or(&lookup, "RATE_MARK_PER_MIN", 600)?,
            rate_scan_per_min: parse_or(&lookup, "RATE_SCAN_PER_MIN", 120)?,
            rate_read_per_min: parse_or(&lookup, "RATE_READ_PER_MIN", 600)?,

            log_dir: string_or("LOG_DIR", "logs"),
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::INFO)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // the governor refuses a zero burst, catch it before the server starts
        let rates = [
            ("RATE_MARK_PER_MIN", self.rate_mark_per_min),
            ("RATE_SCAN_PER_MIN", self.rate_scan_per_min),
            ("RATE_READ_PER_MIN", self.rate_read_per_min),
            ("DB_MAX_CONNECTIONS", self.db_max_connections),
        ];
        for (key, value) in rates {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_mobile_client() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_that!(config.server_addr.as_str()).is_equal_to("0.0.0.0:5000");
        assert_that!(config.api_prefix.as_str()).is_equal_to("");
        assert_that!(config.google_api_key).is_none();
        assert_that!(config.log_level).is_equal_to(tracing::Level::INFO);
    }

    #[test]
    fn blank_api_key_disables_cloud_fallback() {
        let config = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "  ")])).unwrap();
        assert_that!(config.google_api_key).is_none();

        let config = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "abc")])).unwrap();
        assert_that!(config.google_api_key).is_equal_to(Some("abc".to_string()));
    }

    #[test]
    fn unparseable_number_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("RATE_SCAN_PER_MIN", "lots")])).unwrap_err();
        assert_that!(err.to_string()).contains("RATE_SCAN_PER_MIN");
    }

    #[test]
    fn zero_rate_is_rejected() {
        let res = Config::from_lookup(lookup_from(&[("RATE_MARK_PER_MIN", "0")]));
        assert_that!(res).is_err();
    }

    #[test]
    fn log_level_parses() {
        let config = Config::from_lookup(lookup_from(&[("LOG_LEVEL", "debug")])).unwrap();
        assert_that!(config.log_level).is_equal_to(tracing::Level::DEBUG);
    }
}
