//! Single acquisition run: image pair -> landmark -> distance
//!
//! The step only ever moves forward one state at a time. Every transition
//! checks the current step first and leaves the run untouched on failure,
//! so a caller can retry the same step after an external error.

use crate::core::constants::IMAGES_PER_RUN;
use crate::core::types::Measurement;
use crate::services::error::ServiceError;
use crate::services::{Detection, DistanceReading};
use crate::validation::error::{LocatorResult, UsageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Progress of the current run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RunStep {
    #[default]
    AwaitingInputs,
    InputsReady,
    LandmarkDetected,
    DistanceComputed,
}

/// Opaque image payload handed to the external services
#[derive(Clone, PartialEq, Eq)]
pub struct ImageHandle {
    label: String,
    bytes: Arc<[u8]>,
}

impl ImageHandle {
    pub fn new(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("label", &self.label)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Run {
    step: RunStep,
    images: Option<[ImageHandle; IMAGES_PER_RUN]>,
    detection: Option<Detection>,
    distance: Option<DistanceReading>,
}

impl Run {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> RunStep {
        self.step
    }

    pub fn images(&self) -> Option<&[ImageHandle; IMAGES_PER_RUN]> {
        self.images.as_ref()
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    pub fn distance(&self) -> Option<&DistanceReading> {
        self.distance.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.step == RunStep::DistanceComputed
    }

    fn expect_step(&self, expected: RunStep) -> Result<(), UsageError> {
        if self.step != expected {
            return Err(UsageError::StepOutOfOrder {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    /// `AwaitingInputs -> InputsReady`; exactly one image pair per run
    pub fn supply_images(&mut self, images: Vec<ImageHandle>) -> LocatorResult<()> {
        self.expect_step(RunStep::AwaitingInputs)?;
        let supplied = images.len();
        let pair: [ImageHandle; IMAGES_PER_RUN] = images.try_into().map_err(|_| UsageError::WrongImageCount {
            supplied,
            required: IMAGES_PER_RUN,
        })?;

        self.images = Some(pair);
        self.step = RunStep::InputsReady;
        Ok(())
    }

    /// `InputsReady -> LandmarkDetected`.
    ///
    /// A detection below `min_confidence` is rejected and the run stays in
    /// `InputsReady`.
    pub fn record_detection(&mut self, detection: Detection, min_confidence: f64) -> LocatorResult<()> {
        self.expect_step(RunStep::InputsReady)?;
        if !(0.0..=1.0).contains(&detection.confidence) {
            return Err(ServiceError::Malformed {
                details: format!("detection confidence {} outside [0, 1]", detection.confidence),
            }
            .into());
        }
        if detection.confidence < min_confidence {
            return Err(ServiceError::LowConfidence {
                landmark_id: detection.landmark_id,
                confidence: detection.confidence,
                threshold: min_confidence,
            }
            .into());
        }

        self.detection = Some(detection);
        self.step = RunStep::LandmarkDetected;
        Ok(())
    }

    /// `LandmarkDetected -> DistanceComputed`
    pub fn record_distance(&mut self, reading: DistanceReading) -> LocatorResult<()> {
        self.expect_step(RunStep::LandmarkDetected)?;
        if !reading.distance_m.is_finite() || reading.distance_m < 0.0 {
            return Err(ServiceError::Malformed {
                details: format!("distance {} is not a valid range", reading.distance_m),
            }
            .into());
        }

        self.distance = Some(reading);
        self.step = RunStep::DistanceComputed;
        Ok(())
    }

    /// Measurement produced by a completed run
    pub fn to_measurement(&self) -> LocatorResult<Measurement> {
        self.expect_step(RunStep::DistanceComputed)?;
        match (&self.detection, &self.distance) {
            (Some(detection), Some(reading)) => Ok(Measurement::new(
                detection.landmark_id.clone(),
                reading.distance_m,
                detection.confidence,
            )?),
            _ => Err(UsageError::StepOutOfOrder {
                expected: RunStep::DistanceComputed,
                actual: self.step,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::error::LocatorError;

    fn pair() -> Vec<ImageHandle> {
        vec![
            ImageHandle::new("left.jpg", vec![1u8, 2, 3]),
            ImageHandle::new("right.jpg", vec![4u8, 5, 6]),
        ]
    }

    fn detection(confidence: f64) -> Detection {
        Detection {
            landmark_id: "Block A".to_string(),
            confidence,
        }
    }

    #[test]
    fn test_forward_progression() {
        let mut run = Run::new();
        assert_eq!(run.step(), RunStep::AwaitingInputs);

        run.supply_images(pair()).unwrap();
        assert_eq!(run.step(), RunStep::InputsReady);

        run.record_detection(detection(0.9), 0.5).unwrap();
        assert_eq!(run.step(), RunStep::LandmarkDetected);

        run.record_distance(DistanceReading { distance_m: 12.5, match_count: 40 }).unwrap();
        assert!(run.is_complete());

        let measurement = run.to_measurement().unwrap();
        assert_eq!(measurement.landmark_id(), "Block A");
        assert_eq!(measurement.distance_m(), 12.5);
        assert_eq!(measurement.confidence(), 0.9);
    }

    #[test]
    fn test_wrong_image_count_is_usage_error() {
        let mut run = Run::new();
        let mut three = pair();
        three.push(ImageHandle::new("extra.jpg", vec![7u8]));

        let err = run.supply_images(three).unwrap_err();
        assert_eq!(err, LocatorError::from(UsageError::WrongImageCount { supplied: 3, required: 2 }));
        assert_eq!(run.step(), RunStep::AwaitingInputs);

        let err = run.supply_images(vec![ImageHandle::new("one.jpg", vec![1u8])]).unwrap_err();
        assert!(matches!(err, LocatorError::Usage(UsageError::WrongImageCount { supplied: 1, .. })));
    }

    #[test]
    fn test_second_pair_rejected_before_commit() {
        let mut run = Run::new();
        run.supply_images(pair()).unwrap();
        let err = run.supply_images(pair()).unwrap_err();
        assert_eq!(
            err,
            LocatorError::from(UsageError::StepOutOfOrder {
                expected: RunStep::AwaitingInputs,
                actual: RunStep::InputsReady,
            })
        );
    }

    #[test]
    fn test_cannot_skip_detection() {
        let mut run = Run::new();
        run.supply_images(pair()).unwrap();
        let err = run
            .record_distance(DistanceReading { distance_m: 3.0, match_count: 1 })
            .unwrap_err();
        assert!(matches!(err, LocatorError::Usage(UsageError::StepOutOfOrder { .. })));
        assert_eq!(run.step(), RunStep::InputsReady);
        assert!(run.to_measurement().is_err());
    }

    #[test]
    fn test_low_confidence_keeps_inputs_ready() {
        let mut run = Run::new();
        run.supply_images(pair()).unwrap();

        let err = run.record_detection(detection(0.2), 0.5).unwrap_err();
        assert!(matches!(err, LocatorError::ExternalService(ServiceError::LowConfidence { .. })));
        assert_eq!(run.step(), RunStep::InputsReady);
        assert!(run.detection().is_none());

        // Retry of the same step succeeds
        run.record_detection(detection(0.8), 0.5).unwrap();
        assert_eq!(run.step(), RunStep::LandmarkDetected);
    }

    #[test]
    fn test_malformed_distance_rejected() {
        let mut run = Run::new();
        run.supply_images(pair()).unwrap();
        run.record_detection(detection(0.9), 0.5).unwrap();

        let err = run
            .record_distance(DistanceReading { distance_m: f64::NAN, match_count: 0 })
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(run.step(), RunStep::LandmarkDetected);
    }

    #[test]
    fn test_image_handle_debug_hides_payload() {
        let handle = ImageHandle::new("left.jpg", vec![0u8; 1024]);
        assert_eq!(format!("{:?}", handle), "ImageHandle { label: \"left.jpg\", bytes: 1024 }");
    }
}
