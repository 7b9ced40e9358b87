//! In-memory scene representation.
//!
//! - [`Scene`] - Models, materials, skeleton and animation of one document
//! - [`Model`] / [`GeometrySegment`] - Node graph entries and their meshes
//! - [`Material`] - Material table entries
//! - [`Animation`] - Keyframes keyed by bone name hash
//! - [`SceneGraph`] - Index-based parent graph built once from the name links

mod animation;
mod graph;
mod material;
mod model;
#[allow(clippy::module_inception)]
mod scene;

pub use animation::*;
pub use graph::*;
pub use material::*;
pub use model::*;
pub use scene::*;
