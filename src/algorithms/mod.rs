//! Core positioning algorithms

pub mod coordinates;
pub mod geometry;
pub mod multilateration;

pub use coordinates::{CoordinateFrame, CoordinateValidator};
pub use geometry::{GeometryAssessment, GeometryAssessor, GeometryQuality};
pub use multilateration::MultilaterationEngine;
