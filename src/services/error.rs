//! Collaborator error types

use thiserror::Error;

/// Failure of an external detection or distance call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The detection service failed or is unreachable
    #[error("landmark detection failed: {message}")]
    Detection { message: String },

    /// The distance service failed or is unreachable
    #[error("distance estimation failed: {message}")]
    Distance { message: String },

    /// A reply arrived but could not be interpreted
    #[error("malformed service reply: {details}")]
    Malformed { details: String },

    /// Detection succeeded but below the configured confidence threshold
    #[error("detected {landmark_id} with confidence {confidence:.2}, below threshold {threshold:.2}")]
    LowConfidence {
        landmark_id: String,
        confidence: f64,
        threshold: f64,
    },
}

/// Result type for collaborator calls
pub type ServiceResult<T> = Result<T, ServiceError>;
