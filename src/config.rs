pub use self::parser::{
    AuthConfig, Config, DatabaseConfig, HotelConfig, LoggingConfig, MetricsConfig, ServerConfig,
};
pub use self::validator::ConfigError;

mod parser;
mod validator;
