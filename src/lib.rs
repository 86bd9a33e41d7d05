//! Campus Locator
//!
//! Indoor/outdoor positioning on a university campus by multilateration
//! against surveyed landmark buildings. A user photographs landmarks in
//! pairs; external services identify the landmark and estimate its range;
//! three or more ranges are solved in a local planar frame and the result is
//! converted back to latitude/longitude.

pub mod core;
pub mod algorithms;
pub mod session;
pub mod services;
pub mod validation;
pub mod api;
pub mod utils;

// Re-export commonly used types
pub use core::{GeoPoint, Landmark, LandmarkRegistry, Measurement, PlanarPoint, PositionEstimate};
pub use algorithms::{CoordinateFrame, GeometryAssessment, GeometryQuality, MultilaterationEngine};
pub use session::{ImageHandle, MeasurementSession, RunStep, SharedSession};
pub use services::{Detection, DistanceEstimator, DistanceReading, LandmarkDetector, ServiceError};
pub use validation::{LocatorError, LocatorResult, UsageError};
pub use api::{BlockingLocatorApi, LocateResponse, LocatedPosition, OutputFormat, PositionPresenter, SessionStatus};
pub use utils::{init_logging, ConfigurationManager, SystemConfig};
