//! Configuration and logging setup

pub mod config;
pub mod logging;

pub use config::{ConfigurationManager, SystemConfig, ValidationResult};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
