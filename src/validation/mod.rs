//! Error taxonomy and measurement data validation

pub mod data;
pub mod error;

pub use data::{DataIssue, DataReport, DataValidationConfig, DataValidator};
pub use error::{ConfigError, ErrorKind, LocatorError, LocatorResult, UsageError};
