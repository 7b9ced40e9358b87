//! Utility types and functions for the MSH codec.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, bounding boxes and packed colours

mod error;
mod math;

pub use error::*;
pub use math::*;
