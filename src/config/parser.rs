use super::ConfigError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub hotel: HotelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    /// Token that authenticates as a built-in administrator. Meant for
    /// bootstrapping the first real accounts.
    #[serde(default)]
    pub bootstrap_token: Option<SecretString>,
}

impl AuthConfig {
    pub fn matches_bootstrap(&self, token: &str) -> bool {
        self.bootstrap_token
            .as_ref()
            .is_some_and(|secret| {
                constant_time_eq(secret.expose_secret().as_bytes(), token.as_bytes())
            })
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(expected: &[u8], given: &[u8]) -> bool {
    if expected.len() != given.len() {
        return false;
    }
    expected
        .iter()
        .zip(given)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn for_sqlite_file(path: impl Into<String>) -> Self {
        Self {
            url: None,
            filename: Some(path.into()),
            max_connections: Some(2),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        let url = self.connection_string();
        url.strip_prefix("sqlite://").map(ToString::to_string)
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(4).max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotelConfig {
    #[serde(default = "default_hotel_name")]
    pub name: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Flat fee charged per day a guest stays past the booked check-out date.
    #[serde(default = "default_late_checkout_fee_cents")]
    pub late_checkout_fee_cents: i64,
    #[serde(default = "default_max_stay_nights")]
    pub max_stay_nights: i64,
    #[serde(default = "default_chat_page_size")]
    pub chat_page_size: i64,
}

impl Default for HotelConfig {
    fn default() -> Self {
        Self {
            name: default_hotel_name(),
            currency: default_currency(),
            late_checkout_fee_cents: default_late_checkout_fee_cents(),
            max_stay_nights: default_max_stay_nights(),
            chat_page_size: default_chat_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let config_path =
                    std::env::var("HRS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
                Self::load_from_file(config_path)
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("HRS_DATABASE_URL") {
            self.database.url = Some(value);
        }
        if let Ok(value) = std::env::var("HRS_BOOTSTRAP_TOKEN") {
            self.auth.bootstrap_token = Some(SecretString::from(value));
        }
        if let Ok(value) = std::env::var("HRS_PORT") {
            self.server.port = parse_port(&value)?;
        }
        if let Ok(value) = std::env::var("HRS_LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidConfig(format!("HRS_PORT {value:?} is not a port: {e}")))
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_hotel_name() -> String {
    "Hotel".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_late_checkout_fee_cents() -> i64 {
    2500
}

fn default_max_stay_nights() -> i64 {
    30
}

fn default_chat_page_size() -> i64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{constant_time_eq, parse_port};
    use crate::config::ConfigError;

    #[test_case("8081", Some(8081) ; "plain")]
    #[test_case(" 9000 ", Some(9000) ; "padded")]
    #[test_case("http", None ; "not numeric")]
    #[test_case("70000", None ; "out of range")]
    #[test_case("", None ; "empty")]
    fn port_overrides(value: &str, expected: Option<u16>) {
        match (parse_port(value), expected) {
            (Ok(port), Some(want)) => assert_eq!(port, want),
            (Err(ConfigError::InvalidConfig(message)), None) => {
                assert!(message.contains("HRS_PORT"), "{message:?}")
            }
            (other, _) => panic!("unexpected {other:?} for {value:?}"),
        }
    }

    #[test]
    fn token_comparison_checks_length_and_every_byte() {
        assert!(constant_time_eq(b"0123456789abcdef", b"0123456789abcdef"));
        assert!(!constant_time_eq(b"0123456789abcdef", b"0123456789abcdeF"));
        assert!(!constant_time_eq(b"0123456789abcdef", b"x123456789abcdef"));
        assert!(!constant_time_eq(b"0123456789abcdef", b"0123456789abcdef0"));
        assert!(!constant_time_eq(b"abc", b""));
    }
}
