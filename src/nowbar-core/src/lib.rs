pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    Config, ConfigError, ConfigOverrides, LogLevel, LoggingConfig, LoggingOverrides,
    ValidationError,
};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use paths::{AppDirs, DirsError};

pub const APP_NAME: &str = "nowbar";
pub const APP_AUTHOR: &str = "Nowbar";
pub const APP_QUALIFIER: &str = "io";
