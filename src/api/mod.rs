//! Orchestration API and position output
//!
//! [`BlockingLocatorApi`] walks a measurement session through its runs using
//! the detection and distance collaborators, then solves and presents the
//! position. [`formatting`] renders located positions as text, JSON or CSV.

pub mod blocking;
pub mod formatting;
pub mod types;

pub use blocking::BlockingLocatorApi;
pub use formatting::{
    CsvFormatter, JsonFormatter, LocateResponse, LocatedPosition, OutputFormat, PositionPresenter, TextFormatter,
};
pub use types::SessionStatus;
