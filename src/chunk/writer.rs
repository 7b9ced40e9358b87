//! Chunk writer implementation.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use glam::{Quat, Vec2, Vec3};

use super::format::*;
use crate::util::{Error, Result};

/// In-memory chunk emitter.
///
/// [`ChunkWriter::child`] writes the header with a size placeholder, runs the
/// payload closure, zero-pads to [`WRITE_ALIGNMENT`] and then patches the size,
/// so the stored size is always the exact (padded) payload length.
#[derive(Default)]
pub struct ChunkWriter {
    buf: Vec<u8>,
}

impl ChunkWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    /// Finish and return the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write one chunk whose payload is produced by `f`.
    pub fn child<F>(&mut self, tag: ChunkTag, f: F) -> Result<()>
    where
        F: FnOnce(&mut ChunkWriter) -> Result<()>,
    {
        self.write_bytes(&tag.fourcc().bytes())?;
        let size_pos = self.pos();
        self.write_u32(0)?;

        let start = self.pos();
        f(self)?;
        let padded = padded_len(self.pos() - start);
        self.buf.resize(start + padded, 0);

        let size = u32::try_from(padded)
            .map_err(|_| Error::degenerate(format!("{} chunk exceeds 4 GiB", tag)))?;
        LittleEndian::write_u32(&mut self.buf[size_pos..size_pos + 4], size);
        Ok(())
    }

    /// Write a chunk holding only a null-terminated string.
    pub fn string_child(&mut self, tag: ChunkTag, value: &str) -> Result<()> {
        self.child(tag, |w| w.write_string(value))
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write an i32 value (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write an f32 value (little-endian).
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a slice of f32 values.
    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.write_f32(v)?;
        }
        Ok(())
    }

    /// Write a 2D vector.
    pub fn write_vec2(&mut self, v: Vec2) -> Result<()> {
        self.write_f32_slice(&v.to_array())
    }

    /// Write a 3D vector.
    pub fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32_slice(&v.to_array())
    }

    /// Write a quaternion as x, y, z, w.
    pub fn write_quat(&mut self, q: Quat) -> Result<()> {
        self.write_f32_slice(&q.to_array())
    }

    /// Write a null-terminated string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_u8(0)
    }

    /// Write a string into a fixed-size, zero-padded field.
    pub fn write_fixed_string(&mut self, value: &str, size: usize) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() >= size {
            return Err(Error::degenerate(format!(
                "string '{}' does not fit a {}-byte field",
                value, size
            )));
        }
        self.write_bytes(bytes)?;
        self.buf.resize(self.buf.len() + size - bytes.len(), 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkReader;

    #[test]
    fn test_sizes_are_patched_and_padded() {
        let mut w = ChunkWriter::new();
        w.child(ChunkTag::Modl, |w| {
            w.string_child(ChunkTag::Name, "abc")?;
            w.child(ChunkTag::Mndx, |w| w.write_u32(3))
        })
        .unwrap();
        let bytes = w.into_bytes();

        // MODL header + NAME(8 + 4) + MNDX(8 + 4)
        assert_eq!(bytes.len(), 8 + 12 + 12);
        assert_eq!(&bytes[0..4], b"MODL");
        assert_eq!(LittleEndian::read_u32(&bytes[4..8]), 24);
        assert_eq!(LittleEndian::read_u32(&bytes[12..16]), 4);
    }

    #[test]
    fn test_string_padding() {
        let mut w = ChunkWriter::new();
        w.string_child(ChunkTag::Name, "bone_root").unwrap();
        let bytes = w.into_bytes();
        // 9 chars + terminator = 10, padded to 12
        assert_eq!(LittleEndian::read_u32(&bytes[4..8]), 12);
        assert_eq!(bytes.len(), 20);
    }

    #[test]
    fn test_reader_sees_written_chunks() {
        let mut w = ChunkWriter::new();
        w.child(ChunkTag::Tran, |w| {
            w.write_vec3(Vec3::ONE)?;
            w.write_quat(Quat::IDENTITY)?;
            w.write_vec3(Vec3::new(1.0, 2.0, 3.0))
        })
        .unwrap();
        w.child(ChunkTag::Cl1l, |_| Ok(())).unwrap();
        let bytes = w.into_bytes();

        let mut r = ChunkReader::new(&bytes);
        let mut tran = r.enter_child().unwrap();
        assert_eq!(tran.tag(), Some(ChunkTag::Tran));
        tran.skip(12).unwrap();
        assert_eq!(tran.read_quat().unwrap(), Quat::IDENTITY);
        assert_eq!(tran.read_vec3().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(r.skip_child().unwrap(), ChunkTag::Cl1l);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_fixed_string() {
        let mut w = ChunkWriter::new();
        w.write_fixed_string("fullanimation", CYCLE_NAME_SIZE).unwrap();
        assert_eq!(w.pos(), CYCLE_NAME_SIZE);
        assert!(w.write_fixed_string(&"x".repeat(64), CYCLE_NAME_SIZE).is_err());
    }
}
