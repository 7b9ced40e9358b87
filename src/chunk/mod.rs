//! Low-level chunk container implementation.
//!
//! An `.msh` file is a tree of tagged, length-prefixed chunks. Whether a
//! payload holds child chunks or raw fields is decided by the tag, not by
//! anything in the stream itself.
//!
//! ## Chunk Layout
//!
//! ```text
//! +------------------+
//! | Tag: "MODL"      |  4 bytes (ASCII)
//! +------------------+
//! | Size             |  4 bytes (u32 LE, payload byte count)
//! +------------------+
//! | Payload          |  `size` bytes, padded to an even length
//! +------------------+
//! ```
//!
//! A document is a single `HEDR` chunk wrapping `MSH2`, `SKL2`, `BLN2`,
//! `ANM2` and a closing `CL1L`.

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
