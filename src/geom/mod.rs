//! Geometry assembly.
//!
//! - [`strip`] - `STRP` flag decoding and triangle stripification
//! - [`assemble`] - Per-material vertex deduplication of host meshes
//! - [`weights`] - Envelope lookup, model-index remapping and influence limits

pub mod assemble;
pub mod strip;
pub mod weights;

pub use assemble::{assemble_segments, LoopTriangle, MeshPolygon, TriangulatedMesh};
pub use strip::{decode_strips, encode_strips, strip_triangles, stripify};
pub use weights::{
    build_envelope, envelope_slots, limit_influences, remap_weights, resolve_envelope, ModelIndexRemap,
};
