//! Utility types shared by the builders.
//!
//! - [`Bounds`] - Axis-aligned box with union/area operations
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
