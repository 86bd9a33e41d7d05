//! Measurement collection: runs, sessions and exclusive session access

pub mod run;
pub mod measurement;
pub mod shared;

pub use run::{ImageHandle, Run, RunStep};
pub use measurement::{MeasurementSession, SessionSnapshot};
pub use shared::SharedSession;
