use secrecy::ExposeSecret;
use thiserror::Error;

use super::Config;

const MIN_BOOTSTRAP_TOKEN_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let connection = self.database.connection_string();
        if connection.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database connection string cannot be empty".to_string(),
            ));
        }
        if !connection.starts_with("sqlite://") {
            return Err(ConfigError::InvalidConfig(format!(
                "unsupported database url {connection:?}, expected sqlite://"
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.hotel.late_checkout_fee_cents < 0 {
            return Err(ConfigError::InvalidConfig(
                "hotel.late_checkout_fee_cents cannot be negative".to_string(),
            ));
        }

        if self.hotel.max_stay_nights <= 0 {
            return Err(ConfigError::InvalidConfig(
                "hotel.max_stay_nights must be at least 1".to_string(),
            ));
        }

        if !(1..=500).contains(&self.hotel.chat_page_size) {
            return Err(ConfigError::InvalidConfig(
                "hotel.chat_page_size must be between 1 and 500".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidConfig(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        if let Some(token) = &self.auth.bootstrap_token {
            if token.expose_secret().len() < MIN_BOOTSTRAP_TOKEN_LEN {
                return Err(ConfigError::InvalidConfig(format!(
                    "auth.bootstrap_token must be at least {MIN_BOOTSTRAP_TOKEN_LEN} characters"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use test_case::test_case;

    use super::{Config, ConfigError};

    const MINIMAL: &str = r#"
database:
  filename: /tmp/hrs.db
"#;

    fn parse(yaml: &str) -> Config {
        Config::from_yaml(yaml).expect("yaml parses")
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(MINIMAL);
        config.validate().expect("valid");

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hotel.late_checkout_fee_cents, 2500);
        assert_eq!(config.hotel.chat_page_size, 50);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.metrics.enabled);
        assert_eq!(
            config.database.connection_string(),
            "sqlite:///tmp/hrs.db"
        );
        assert_eq!(config.database.sqlite_path().as_deref(), Some("/tmp/hrs.db"));
    }

    #[test_case("server:\n  port: 0\n", "server.port" ; "zero port")]
    #[test_case(
        "hotel:\n  late_checkout_fee_cents: -1\n",
        "late_checkout_fee_cents" ;
        "negative fee"
    )]
    #[test_case("hotel:\n  max_stay_nights: 0\n", "max_stay_nights" ; "zero stay")]
    #[test_case("hotel:\n  chat_page_size: 1000\n", "chat_page_size" ; "oversized chat page")]
    #[test_case("logging:\n  format: xml\n", "logging.format" ; "unknown log format")]
    #[test_case("auth:\n  bootstrap_token: short\n", "bootstrap_token" ; "short token")]
    fn invalid_values_are_rejected(extra: &str, needle: &str) {
        let config = parse(&format!("{MINIMAL}{extra}"));
        match config.validate() {
            Err(ConfigError::InvalidConfig(message)) => assert!(
                message.contains(needle),
                "{message:?} should mention {needle:?}"
            ),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn non_sqlite_url_is_rejected() {
        let config = parse("database:\n  url: postgres://localhost/hrs\n");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_database_is_rejected() {
        let config = parse("database: {}\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn bootstrap_token_matches_exactly() {
        let config = parse(&format!(
            "{MINIMAL}auth:\n  bootstrap_token: 0123456789abcdef\n"
        ));
        config.validate().expect("valid");
        assert!(config.auth.matches_bootstrap("0123456789abcdef"));
        assert!(!config.auth.matches_bootstrap("0123456789abcde"));
    }

    #[test]
    fn load_from_file_reads_yaml() {
        let mut file = NamedTempFile::new().expect("temp config");
        writeln!(file, "{MINIMAL}hotel:\n  name: Seaside").expect("write config");

        let config = Config::load_from_file(file.path()).expect("config loads");
        assert_eq!(config.hotel.name, "Seaside");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load_from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
