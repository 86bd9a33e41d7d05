//! Error taxonomy for the campus positioning system
//!
//! Every failure path in the crate ends up in [`LocatorError`]. The variants
//! follow how a caller is expected to react:
//! - `Usage`: the call was invalid in the current state; fix the input.
//! - `ExternalService`: a collaborator failed; the run is untouched and the
//!   same step may be retried.
//! - `InsufficientData`: collect more runs before solving.
//! - `DegenerateGeometry`: the landmark selection gives no unique fix.
//! - `Config`: configuration could not be loaded or is invalid.

use crate::core::types::Measurement;
use crate::services::error::ServiceError;
use crate::session::run::RunStep;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for positioning operations
pub type LocatorResult<T> = Result<T, LocatorError>;

/// Top-level error for session, solver and API operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocatorError {
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("external service error: {0}")]
    ExternalService(#[from] ServiceError),

    #[error("insufficient data: {resolvable} resolvable measurements, {required} required")]
    InsufficientData { resolvable: usize, required: usize },

    #[error(
        "degenerate geometry: normal matrix determinant {determinant:e} over {} measurements",
        .measurements.len()
    )]
    DegenerateGeometry {
        determinant: f64,
        measurements: Vec<Measurement>,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Caller mistakes, rejected synchronously and never retried internally
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UsageError {
    #[error("a run needs exactly {required} images, {supplied} supplied")]
    WrongImageCount { supplied: usize, required: usize },

    #[error("run is at {actual:?}, operation requires {expected:?}")]
    StepOutOfOrder { expected: RunStep, actual: RunStep },

    #[error("session is full ({capacity} measurements committed)")]
    SessionFull { capacity: usize },

    #[error("another transition is in progress on this session")]
    SessionBusy,

    #[error("session capacity must be at least {minimum}, got {capacity}")]
    InvalidCapacity { capacity: usize, minimum: usize },

    #[error("detection confidence threshold must be within [0, 1], got {threshold}")]
    InvalidConfidenceThreshold { threshold: f64 },

    #[error("invalid measurement: {reason}")]
    InvalidMeasurement { reason: String },

    #[error("invalid coordinate: {reason}")]
    InvalidCoordinate { reason: String },

    #[error("duplicate landmark id: {id}")]
    DuplicateLandmark { id: String },
}

/// Configuration load, save and validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("configuration I/O failed: {message}")]
    Io { message: String },

    #[error("configuration (de)serialization failed: {message}")]
    Serialization { message: String },

    #[error("invalid parameter {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::Io { message: error.to_string() }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Serialization { message: error.to_string() }
    }
}

/// Coarse classification of a [`LocatorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Usage,
    ExternalService,
    InsufficientData,
    DegenerateGeometry,
    Config,
}

impl LocatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocatorError::Usage(_) => ErrorKind::Usage,
            LocatorError::ExternalService(_) => ErrorKind::ExternalService,
            LocatorError::InsufficientData { .. } => ErrorKind::InsufficientData,
            LocatorError::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            LocatorError::Config(_) => ErrorKind::Config,
        }
    }

    /// Only collaborator failures can succeed on a retry of the same step
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::ExternalService(_))
    }
}
