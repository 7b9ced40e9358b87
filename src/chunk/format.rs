//! Chunk format constants and the tag vocabulary.

use std::fmt;

/// Size of a chunk header (tag + size) in bytes.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Size of a chunk tag in bytes.
pub const TAG_SIZE: usize = 4;

/// Payload alignment used when writing.
pub const WRITE_ALIGNMENT: usize = 4;

/// Flag bit marking a restart in `STRP` index streams.
pub const STRIP_FLAG: u16 = 0x8000;

/// Mask extracting the vertex index from a `STRP` entry.
pub const STRIP_INDEX_MASK: u16 = 0x7FFF;

/// Largest vertex count addressable by a segment (15-bit strip indices).
pub const MAX_VERTEX_COUNT: usize = STRIP_INDEX_MASK as usize;

/// Number of weight slots stored per vertex in `WGHT`.
pub const WEIGHTS_PER_VERTEX: usize = 4;

/// Weights at or below this magnitude are dropped when decoding.
pub const MIN_WEIGHT: f32 = 1e-6;

/// Fixed length of an animation name in `CYCL`.
pub const CYCLE_NAME_SIZE: usize = 64;

/// Four-character chunk identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Tag bytes.
    #[inline]
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({})", self)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

macro_rules! chunk_tags {
    ($($(#[$doc:meta])* $variant:ident = $bytes:literal,)*) => {
        /// Known chunk tags.
        ///
        /// Anything else decodes to [`ChunkTag::Unknown`] so readers can skip it.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum ChunkTag {
            $($(#[$doc])* $variant,)*
            /// A tag outside the known vocabulary.
            Unknown(FourCC),
        }

        impl ChunkTag {
            /// Wire representation of the tag.
            pub const fn fourcc(self) -> FourCC {
                match self {
                    $(Self::$variant => FourCC(*$bytes),)*
                    Self::Unknown(cc) => cc,
                }
            }
        }

        impl From<FourCC> for ChunkTag {
            fn from(cc: FourCC) -> Self {
                match &cc.0 {
                    $($bytes => Self::$variant,)*
                    _ => Self::Unknown(cc),
                }
            }
        }
    };
}

chunk_tags! {
    /// File header, wraps everything else.
    Hedr = b"HEDR",
    /// Mesh container.
    Msh2 = b"MSH2",
    /// Scene information.
    Sinf = b"SINF",
    /// Name string (scene, material or model).
    Name = b"NAME",
    /// Frame range and frame rate.
    Fram = b"FRAM",
    /// Bounding box.
    Bbox = b"BBOX",
    /// Material list.
    Matl = b"MATL",
    /// Material definition.
    Matd = b"MATD",
    /// Material colours.
    Data = b"DATA",
    /// Material attributes.
    Atrb = b"ATRB",
    /// Texture slot 0.
    Tx0d = b"TX0D",
    /// Texture slot 1.
    Tx1d = b"TX1D",
    /// Texture slot 2.
    Tx2d = b"TX2D",
    /// Texture slot 3.
    Tx3d = b"TX3D",
    /// Model.
    Modl = b"MODL",
    /// Model type.
    Mtyp = b"MTYP",
    /// Declared model index.
    Mndx = b"MNDX",
    /// Parent name.
    Prnt = b"PRNT",
    /// Model flags.
    Flgs = b"FLGS",
    /// Local transform.
    Tran = b"TRAN",
    /// Geometry container.
    Geom = b"GEOM",
    /// Geometry segment.
    Segm = b"SEGM",
    /// Material index of a segment.
    Mati = b"MATI",
    /// Positions.
    Posl = b"POSL",
    /// Normals.
    Nrml = b"NRML",
    /// Packed vertex colours.
    Clrl = b"CLRL",
    /// Texture coordinates.
    Uv0l = b"UV0L",
    /// Polygon list.
    Ndxl = b"NDXL",
    /// Triangle list.
    Ndxt = b"NDXT",
    /// Flagged triangle strips.
    Strp = b"STRP",
    /// Vertex weights.
    Wght = b"WGHT",
    /// Envelope (weight index to model index table).
    Envl = b"ENVL",
    /// Collision primitive.
    Swci = b"SWCI",
    /// Skeleton bone list.
    Skl2 = b"SKL2",
    /// Bone blend factors.
    Bln2 = b"BLN2",
    /// Animation container.
    Anm2 = b"ANM2",
    /// Animation cycles.
    Cycl = b"CYCL",
    /// Keyframes.
    Kfr3 = b"KFR3",
    /// End of file marker.
    Cl1l = b"CL1L",
}

/// Texture slot tags in slot order.
pub const TEXTURE_SLOT_TAGS: [ChunkTag; 4] =
    [ChunkTag::Tx0d, ChunkTag::Tx1d, ChunkTag::Tx2d, ChunkTag::Tx3d];

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.fourcc(), f)
    }
}

/// Payload length after write padding.
#[inline]
pub const fn padded_len(len: usize) -> usize {
    (len + WRITE_ALIGNMENT - 1) / WRITE_ALIGNMENT * WRITE_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        assert_eq!(ChunkTag::from(FourCC(*b"MODL")), ChunkTag::Modl);
        assert_eq!(ChunkTag::Modl.fourcc(), FourCC(*b"MODL"));
        assert_eq!(ChunkTag::Tx3d.to_string(), "TX3D");
    }

    #[test]
    fn test_unknown_tag() {
        let tag = ChunkTag::from(FourCC(*b"SHDW"));
        assert_eq!(tag, ChunkTag::Unknown(FourCC(*b"SHDW")));
        assert_eq!(tag.fourcc(), FourCC(*b"SHDW"));
        assert_eq!(FourCC([b'A', 0, b'B', 0xFF]).to_string(), "A.B.");
    }

    #[test]
    fn test_padding() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(1), 4);
        assert_eq!(padded_len(4), 4);
        assert_eq!(padded_len(9), 12);
    }

    #[test]
    fn test_strip_constants() {
        assert_eq!(STRIP_FLAG & STRIP_INDEX_MASK, 0);
        assert_eq!(MAX_VERTEX_COUNT, 32767);
    }
}
