//! # MSH
//!
//! Rust implementation of the Star Wars Battlefront `.msh` scene format.
//!
//! An `.msh` document is a tree of tagged chunks holding a node graph of
//! models, a material table, per-segment meshes with optional skin weights,
//! a skeleton list and one animation clip. This crate decodes documents into a
//! [`Scene`], encodes scenes back, and provides the geometry and skeleton
//! helpers both directions need.
//!
//! ## Modules
//!
//! - [`util`] - Errors, bounding boxes, packed colours
//! - [`chunk`] - Low-level chunk reader and writer
//! - [`scene`] - Scene data model (Model, GeometrySegment, Material, Animation)
//! - [`codec`] - Document decoding and encoding
//! - [`geom`] - Triangle strips, vertex dedup, weight envelopes
//! - [`skeleton`] - Minimal bone hierarchy extraction
//! - [`gather`] - Host node descriptions to models
//!
//! ## Example
//!
//! ```ignore
//! let scene = msh::read_file("prop.msh")?;
//! for model in &scene.models {
//!     println!("{} ({:?})", model.name, model.kind);
//! }
//! let bytes = msh::encode(&scene, &msh::NoMeshes)?;
//! ```

pub mod util;
pub mod chunk;
pub mod scene;
pub mod geom;
pub mod codec;
pub mod skeleton;
pub mod gather;

// Re-export commonly used types
pub use msh_crc::crc;
pub use util::{Error, Result};
pub use codec::{
    decode, encode, encode_opts, read_file, read_file_opts, write_file, EncodeOptions, MeshProvider,
    NoMeshes, ReadOptions,
};
pub use scene::{Animation, GeometrySegment, Material, Model, ModelKind, ModelTransform, Scene};
pub use skeleton::{refine_skeleton, RefinedBone};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::codec::{decode, encode, encode_opts, EncodeOptions, MeshProvider, NoMeshes, ReadOptions};
    pub use crate::scene::*;
    pub use crate::geom::TriangulatedMesh;
    pub use crate::skeleton::{refine_skeleton, RefinedBone};
    pub use msh_crc::crc;
}
