//! Measurement session
//!
//! Owns the committed measurements and the one live [`Run`]. Commits are
//! bounded by the configured capacity; the session never solves on its own,
//! it only reports when enough resolvable measurements are present.

use crate::core::constants::{DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_SESSION_CAPACITY, MIN_MEASUREMENTS};
use crate::core::registry::LandmarkRegistry;
use crate::core::types::Measurement;
use crate::services::{Detection, DistanceReading};
use crate::session::run::{ImageHandle, Run, RunStep};
use crate::utils::config::SessionConfig;
use crate::validation::error::{LocatorResult, UsageError};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MeasurementSession {
    committed: Vec<Measurement>,
    capacity: usize,
    min_detection_confidence: f64,
    current: Run,
}

/// Point-in-time view of a session, for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub step: RunStep,
    pub committed: usize,
    pub capacity: usize,
    pub resolvable: usize,
    pub ready_to_solve: bool,
}

impl Default for MeasurementSession {
    fn default() -> Self {
        Self {
            committed: Vec::with_capacity(DEFAULT_SESSION_CAPACITY),
            capacity: DEFAULT_SESSION_CAPACITY,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            current: Run::new(),
        }
    }
}

impl MeasurementSession {
    /// Create a session holding up to `capacity` measurements (at least 3)
    pub fn new(capacity: usize) -> Result<Self, UsageError> {
        if capacity < MIN_MEASUREMENTS {
            return Err(UsageError::InvalidCapacity {
                capacity,
                minimum: MIN_MEASUREMENTS,
            });
        }
        Ok(Self {
            committed: Vec::with_capacity(capacity),
            capacity,
            ..Default::default()
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, UsageError> {
        Self::new(config.capacity)?.with_min_detection_confidence(config.min_detection_confidence)
    }

    /// Detections below `threshold` are refused; NaN is rejected with the rest
    pub fn with_min_detection_confidence(mut self, threshold: f64) -> Result<Self, UsageError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(UsageError::InvalidConfidenceThreshold { threshold });
        }
        self.min_detection_confidence = threshold;
        Ok(self)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn min_detection_confidence(&self) -> f64 {
        self.min_detection_confidence
    }

    pub fn committed(&self) -> &[Measurement] {
        &self.committed
    }

    pub fn current(&self) -> &Run {
        &self.current
    }

    pub fn step(&self) -> RunStep {
        self.current.step()
    }

    pub fn is_full(&self) -> bool {
        self.committed.len() == self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.committed.len()
    }

    /// Committed measurements whose landmark is registered
    pub fn resolvable_count(&self, registry: &LandmarkRegistry) -> usize {
        self.committed
            .iter()
            .filter(|m| registry.contains(m.landmark_id()))
            .count()
    }

    pub fn ready_to_solve(&self, registry: &LandmarkRegistry) -> bool {
        self.resolvable_count(registry) >= MIN_MEASUREMENTS
    }

    pub fn supply_images(&mut self, images: Vec<ImageHandle>) -> LocatorResult<()> {
        let supplied = images.len();
        self.current.supply_images(images).map_err(|e| {
            warn!(step = ?self.current.step(), supplied, error = %e, "image pair rejected");
            e
        })?;
        debug!(committed = self.committed.len(), "run inputs ready");
        Ok(())
    }

    pub fn record_detection(&mut self, detection: Detection) -> LocatorResult<()> {
        let landmark = detection.landmark_id.clone();
        self.current
            .record_detection(detection, self.min_detection_confidence)
            .map_err(|e| {
                warn!(landmark = %landmark, error = %e, "detection not accepted");
                e
            })?;
        debug!(landmark = %landmark, "landmark detected");
        Ok(())
    }

    pub fn record_distance(&mut self, reading: DistanceReading) -> LocatorResult<()> {
        self.current.record_distance(reading)?;
        debug!(distance_m = reading.distance_m, matches = reading.match_count, "distance computed");
        Ok(())
    }

    /// Append the completed run's measurement and start a fresh run.
    ///
    /// Rejected while the run is incomplete or once `capacity` measurements
    /// are committed; in both cases nothing changes.
    pub fn commit(&mut self) -> LocatorResult<&Measurement> {
        if self.is_full() {
            warn!(capacity = self.capacity, "commit rejected, session full");
            return Err(UsageError::SessionFull { capacity: self.capacity }.into());
        }
        let measurement = self.current.to_measurement()?;

        info!(
            landmark = %measurement.landmark_id(),
            distance_m = measurement.distance_m(),
            committed = self.committed.len() + 1,
            capacity = self.capacity,
            "measurement committed"
        );
        self.committed.push(measurement);
        self.current = Run::new();

        let index = self.committed.len() - 1;
        Ok(&self.committed[index])
    }

    /// Discard the current run only; committed measurements stay
    pub fn discard_run(&mut self) {
        debug!(step = ?self.current.step(), "run discarded");
        self.current = Run::new();
    }

    /// Clear every committed measurement and start over
    pub fn reset(&mut self) {
        info!(discarded = self.committed.len(), "session reset");
        self.committed.clear();
        self.current = Run::new();
    }

    pub fn snapshot(&self, registry: &LandmarkRegistry) -> SessionSnapshot {
        let resolvable = self.resolvable_count(registry);
        SessionSnapshot {
            step: self.step(),
            committed: self.committed.len(),
            capacity: self.capacity,
            resolvable,
            ready_to_solve: resolvable >= MIN_MEASUREMENTS,
        }
    }
}
