//! Core types, constants and the landmark registry

pub mod types;
pub mod constants;
pub mod registry;

pub use types::*;
pub use constants::*;
pub use registry::LandmarkRegistry;
