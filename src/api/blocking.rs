//! Blocking API for campus positioning
//!
//! Drives a measurement session through its runs by calling the detection
//! and distance collaborators synchronously, then solves and presents the
//! position. Each step holds exclusive access to the session for its whole
//! duration, collaborator calls included; a concurrent call is rejected with
//! `SessionBusy`.

use crate::algorithms::multilateration::{resolve, MultilaterationEngine};
use crate::api::formatting::{LocatedPosition, PositionPresenter};
use crate::api::types::{ApiCounters, SessionStatus};
use crate::core::registry::LandmarkRegistry;
use crate::core::types::{Measurement, PlanarPoint};
use crate::services::{Detection, DistanceEstimator, DistanceReading, LandmarkDetector};
use crate::session::{ImageHandle, MeasurementSession, RunStep, SharedSession};
use crate::utils::config::ConfigurationManager;
use crate::validation::data::DataValidator;
use crate::validation::error::{LocatorResult, UsageError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BlockingLocatorApi<D, E> {
    detector: D,
    estimator: E,
    session: SharedSession,
    registry: Arc<LandmarkRegistry>,
    engine: MultilaterationEngine,
    presenter: PositionPresenter,
    validator: DataValidator,
    counters: ApiCounters,
}

impl<D, E> BlockingLocatorApi<D, E>
where
    D: LandmarkDetector,
    E: DistanceEstimator,
{
    /// Default session and solver over `registry`
    pub fn new(detector: D, estimator: E, registry: Arc<LandmarkRegistry>) -> Self {
        let presenter = PositionPresenter::new(*registry.reference());
        Self {
            detector,
            estimator,
            session: SharedSession::default(),
            registry,
            engine: MultilaterationEngine::new(),
            presenter,
            validator: DataValidator::new(),
            counters: ApiCounters::default(),
        }
    }

    /// Build registry, session, solver and presenter from configuration
    pub fn from_config(detector: D, estimator: E, config: &ConfigurationManager) -> LocatorResult<Self> {
        let registry = Arc::new(config.build_registry()?);
        let session = MeasurementSession::from_config(config.session_config())?;
        let presenter =
            PositionPresenter::new(*registry.reference()).with_precision(config.config().output.precision);

        info!(
            landmarks = registry.len(),
            capacity = session.capacity(),
            "locator initialized"
        );
        Ok(Self {
            detector,
            estimator,
            session: SharedSession::new(session),
            registry,
            engine: config.engine(),
            presenter,
            validator: DataValidator::new(),
            counters: ApiCounters::default(),
        })
    }

    pub fn with_session(mut self, session: MeasurementSession) -> Self {
        self.session = SharedSession::new(session);
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn registry(&self) -> &Arc<LandmarkRegistry> {
        &self.registry
    }

    pub fn presenter(&self) -> &PositionPresenter {
        &self.presenter
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    fn track<T>(&self, result: LocatorResult<T>) -> LocatorResult<T> {
        if let Err(error) = &result {
            self.counters.record_failure();
            debug!(kind = ?error.kind(), retryable = error.is_retryable(), "operation failed");
        }
        result
    }

    /// Supply the image pair of the current run
    pub fn capture(&self, images: Vec<ImageHandle>) -> LocatorResult<()> {
        self.track(self.session.transition(|s| s.supply_images(images)))
    }

    /// Identify the landmark in the first image of the pair
    pub fn detect(&self) -> LocatorResult<Detection> {
        self.track(self.session.transition(|s| self.detect_in(s)))
    }

    /// Range the detected landmark using both images
    pub fn measure_distance(&self) -> LocatorResult<DistanceReading> {
        self.track(self.session.transition(|s| self.measure_in(s)))
    }

    pub fn commit(&self) -> LocatorResult<Measurement> {
        self.track(self.session.transition(|s| self.commit_in(s)))
    }

    /// All four steps of a run under a single exclusive access.
    ///
    /// A failing step leaves the run where it stopped, so the caller can retry
    /// that step or discard the run.
    pub fn perform_run(&self, images: Vec<ImageHandle>) -> LocatorResult<Measurement> {
        self.track(self.session.transition(|s| {
            s.supply_images(images)?;
            self.detect_in(s)?;
            self.measure_in(s)?;
            self.commit_in(s)
        }))
    }

    pub fn discard_run(&self) -> LocatorResult<()> {
        self.track(self.session.transition(|s| {
            s.discard_run();
            Ok(())
        }))
    }

    pub fn reset(&self) -> LocatorResult<()> {
        self.track(self.session.transition(|s| {
            s.reset();
            Ok(())
        }))
    }

    /// Solve the committed measurements and place the result on the map.
    ///
    /// Committed measurements are kept; call [`reset`](Self::reset) to start
    /// a new fix.
    pub fn locate(&self) -> LocatorResult<LocatedPosition> {
        let measurements = self.session.read(|s| s.committed().to_vec());
        self.track(self.locate_measurements(&measurements))
    }

    /// Solve a given measurement set without touching the session
    pub fn locate_measurements(&self, measurements: &[Measurement]) -> LocatorResult<LocatedPosition> {
        let report = self.validator.check(measurements, &self.registry);
        for issue in &report.issues {
            warn!(%issue, "measurement check");
        }

        let estimate = self.engine.solve(measurements, &self.registry)?;
        self.counters.record_solve();

        let landmarks: Vec<PlanarPoint> = resolve(measurements, &self.registry)
            .iter()
            .map(|r| r.position)
            .collect();
        let located = self.presenter.present(&estimate, &landmarks);
        info!(
            latitude = located.geo.latitude,
            longitude = located.geo.longitude,
            error_m = located.error_m,
            used = located.used_landmarks,
            quality = ?located.geometry.quality,
            "position located"
        );
        Ok(located)
    }

    pub fn status(&self) -> SessionStatus {
        let snapshot = self.session.read(|s| s.snapshot(&self.registry));
        self.counters.status(snapshot)
    }

    fn detect_in(&self, session: &mut MeasurementSession) -> LocatorResult<Detection> {
        let image = match session.current().images() {
            Some([first, _]) if session.step() == RunStep::InputsReady => first.clone(),
            _ => {
                return Err(UsageError::StepOutOfOrder {
                    expected: RunStep::InputsReady,
                    actual: session.step(),
                }
                .into())
            }
        };

        let detection = self.detector.detect(&image).map_err(|e| {
            warn!(image = image.label(), error = %e, "detection call failed");
            e
        })?;
        debug!(image = image.label(), landmark = %detection.landmark_id, confidence = detection.confidence, "detection reply");

        session.record_detection(detection.clone())?;
        Ok(detection)
    }

    fn measure_in(&self, session: &mut MeasurementSession) -> LocatorResult<DistanceReading> {
        let run = session.current();
        let (left, right, landmark_id) = match (run.images(), run.detection()) {
            (Some([left, right]), Some(detection)) if run.step() == RunStep::LandmarkDetected => {
                (left.clone(), right.clone(), detection.landmark_id.clone())
            }
            _ => {
                return Err(UsageError::StepOutOfOrder {
                    expected: RunStep::LandmarkDetected,
                    actual: run.step(),
                }
                .into())
            }
        };

        let reading = self
            .estimator
            .estimate_distance(&left, &right, &landmark_id)
            .map_err(|e| {
                warn!(landmark = %landmark_id, error = %e, "distance call failed");
                e
            })?;

        session.record_distance(reading)?;
        Ok(reading)
    }

    fn commit_in(&self, session: &mut MeasurementSession) -> LocatorResult<Measurement> {
        let measurement = session.commit()?.clone();
        self.counters.record_commit();
        Ok(measurement)
    }
}
