//! Chunk reader implementation.

use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3};

use super::format::*;
use crate::util::{Error, Result};

/// Cursor over one chunk scope of a byte buffer.
///
/// A reader covers either a whole document or exactly one chunk payload.
/// [`ChunkReader::enter_child`] hands out a new reader for the next child and
/// moves this cursor past the child straight away, so whatever the child reader
/// does (or does not) consume, the parent continues at the next sibling.
#[derive(Clone, Copy)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    tag: Option<ChunkTag>,
    depth: usize,
}

impl<'a> ChunkReader<'a> {
    /// Reader over a whole buffer (the document scope).
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            tag: None,
            depth: 0,
        }
    }

    /// Tag of the chunk this reader is scoped to (`None` for the document).
    #[inline]
    pub fn tag(&self) -> Option<ChunkTag> {
        self.tag
    }

    /// Absolute cursor position in the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute end offset of this scope.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Nesting depth (0 for the document).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bytes left in this scope.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// True if another chunk tag fits before the end of this scope.
    ///
    /// A tag without a complete size field still counts, so that
    /// [`ChunkReader::enter_child`] reports it as truncated.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.remaining() >= TAG_SIZE
    }

    /// Tag of the next chunk, without moving the cursor.
    pub fn peek_next_tag(&self) -> Result<ChunkTag> {
        let bytes = self.peek_bytes(TAG_SIZE)?;
        Ok(ChunkTag::from(FourCC([bytes[0], bytes[1], bytes[2], bytes[3]])))
    }

    /// Consume the next chunk header and return a reader scoped to its payload.
    ///
    /// This reader is left positioned after the child (including its pad byte).
    pub fn enter_child(&mut self) -> Result<ChunkReader<'a>> {
        let tag = self.peek_next_tag()?;
        self.skip(TAG_SIZE)?;
        let size = self.read_u32()? as usize;

        let start = self.pos;
        if size > self.remaining() {
            return Err(Error::Truncated {
                offset: start,
                needed: size,
                end: self.end,
            });
        }
        let child_end = start + size;
        // Odd payloads carry one pad byte, unless the parent ends first.
        self.pos = (child_end + (size & 1)).min(self.end);

        tracing::trace!(depth = self.depth + 1, %tag, offset = start, size, "chunk");

        Ok(ChunkReader {
            data: self.data,
            pos: start,
            end: child_end,
            tag: Some(tag),
            depth: self.depth + 1,
        })
    }

    /// Skip the next chunk entirely.
    pub fn skip_child(&mut self) -> Result<ChunkTag> {
        let tag = self.peek_next_tag()?;
        self.enter_child()?;
        Ok(tag)
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Read raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a u16 value (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read an i32 value (little-endian).
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    /// Read an f32 value (little-endian).
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read `count` u16 values.
    pub fn read_u16_vec(&mut self, count: usize) -> Result<Vec<u16>> {
        let len = count.checked_mul(2).ok_or_else(|| self.overrun(usize::MAX))?;
        let bytes = self.take(len)?;
        let mut out = vec![0u16; count];
        LittleEndian::read_u16_into(bytes, &mut out);
        Ok(out)
    }

    /// Read `count` u32 values.
    pub fn read_u32_vec(&mut self, count: usize) -> Result<Vec<u32>> {
        let len = count.checked_mul(4).ok_or_else(|| self.overrun(usize::MAX))?;
        let bytes = self.take(len)?;
        let mut out = vec![0u32; count];
        LittleEndian::read_u32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read a fixed number of f32 values.
    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N]> {
        let bytes = self.take(N * 4)?;
        let mut out = [0f32; N];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    /// Read two f32 values as a vector.
    pub fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::from_array(self.read_f32_array::<2>()?))
    }

    /// Read three f32 values as a vector.
    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::from_array(self.read_f32_array::<3>()?))
    }

    /// Read a quaternion stored as x, y, z, w.
    pub fn read_quat(&mut self) -> Result<Quat> {
        Ok(Quat::from_array(self.read_f32_array::<4>()?))
    }

    /// Read a null-terminated string.
    ///
    /// A string without terminator runs to the end of the scope.
    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..self.end];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let text = String::from_utf8(rest[..len].to_vec())?;
        self.pos += (len + 1).min(rest.len());
        Ok(text)
    }

    /// Read a string stored in a fixed-size, zero-padded field.
    pub fn read_fixed_string(&mut self, size: usize) -> Result<String> {
        let bytes = self.take(size)?;
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8(bytes[..len].to_vec())?)
    }

    fn peek_bytes(&self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.overrun(n));
        }
        Ok(&self.data[self.pos..self.pos + n])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(n)?;
        self.pos += n;
        Ok(bytes)
    }

    fn overrun(&self, needed: usize) -> Error {
        Error::Truncated {
            offset: self.pos,
            needed,
            end: self.end,
        }
    }
}
