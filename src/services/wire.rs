//! JSON reply envelopes of the detection and distance services
//!
//! Both services answer with an object tagged by `status`:
//!
//! ```text
//! {"status": "success", "block": "Block A", "confidence": 0.93}
//! {"status": "success", "distance": 12.4, "match_count": 57}
//! {"status": "error", "message": "model failed"}
//! ```
//!
//! Request rejections (HTTP 400) carry no tag, only `{"error": "No image provided"}`.

use crate::services::error::{ServiceError, ServiceResult};
use crate::services::{Detection, DistanceReading};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Label the classifier returns when no class maps to a landmark
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Untagged rejection body
#[derive(Debug, Deserialize)]
struct BareError {
    error: String,
}

/// Decode a tagged reply, falling back to the untagged rejection shape
fn decode<T: DeserializeOwned>(body: &str, service: &str, rejected: impl FnOnce(String) -> T) -> ServiceResult<T> {
    match serde_json::from_str::<T>(body) {
        Ok(reply) => Ok(reply),
        Err(e) => match serde_json::from_str::<BareError>(body) {
            Ok(bare) => Ok(rejected(bare.error)),
            Err(_) => Err(ServiceError::Malformed {
                details: format!("{} reply: {}", service, e),
            }),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DetectionReply {
    Success { block: String, confidence: f64 },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DistanceReply {
    Success {
        /// `null` when no matching object pair was found
        distance: Option<f64>,
        #[serde(default)]
        match_count: u32,
    },
    Error { message: String },
}

impl DetectionReply {
    /// Parse and interpret a raw reply body
    pub fn parse(body: &str) -> ServiceResult<Detection> {
        decode(body, "detection", |message| DetectionReply::Error { message })?.into_detection()
    }

    pub fn into_detection(self) -> ServiceResult<Detection> {
        match self {
            DetectionReply::Success { block, confidence } => {
                if block.is_empty() || block == UNKNOWN_LABEL {
                    return Err(ServiceError::Malformed {
                        details: format!("detection returned no landmark label ({:?})", block),
                    });
                }
                if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
                    return Err(ServiceError::Malformed {
                        details: format!("detection confidence {} outside [0, 1]", confidence),
                    });
                }
                Ok(Detection {
                    landmark_id: block,
                    confidence,
                })
            }
            DetectionReply::Error { message } => Err(ServiceError::Detection { message }),
        }
    }
}

impl DistanceReply {
    pub fn parse(body: &str) -> ServiceResult<DistanceReading> {
        decode(body, "distance", |message| DistanceReply::Error { message })?.into_reading()
    }

    pub fn into_reading(self) -> ServiceResult<DistanceReading> {
        match self {
            DistanceReply::Success { distance: None, .. } => Err(ServiceError::Distance {
                message: "no matching landmark pair in the images".to_string(),
            }),
            DistanceReply::Success {
                distance: Some(distance_m),
                match_count,
            } => {
                if !distance_m.is_finite() || distance_m < 0.0 {
                    return Err(ServiceError::Malformed {
                        details: format!("distance {} is not a valid range", distance_m),
                    });
                }
                Ok(DistanceReading { distance_m, match_count })
            }
            DistanceReply::Error { message } => Err(ServiceError::Distance { message }),
        }
    }
}
