//! The output sink used by the mesh and skeleton writers.
//!
//! Chunks are written with a placeholder length that gets patched after the contents are known.
//! This requires seeking, so files are written to an in memory buffer first
//! using [write_buffered] when writing to disk.
use std::{
    fs::File,
    io::{Cursor, Seek, SeekFrom, Write},
    path::Path,
};

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec3, Vec4};

use crate::chunk::ChunkHeader;
use crate::strings::{pack_length, LINE_DELIMITER};
use crate::{Error, Result};

/// A chunk that has been started but not finished by a [ChunkWriter].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "chunks must be finished to patch their length"]
pub struct OpenChunk {
    tag: u16,
    start: u64,
}

/// Typed little endian writes with support for patching chunk lengths.
pub struct ChunkWriter<'a, W: Write + Seek> {
    writer: &'a mut W,
}

macro_rules! write_impl {
    ($($name:ident, $ty:ty, $write:ident);* $(;)?) => {
        $(
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                self.writer.$write::<LittleEndian>(value)?;
                Ok(())
            }
        )*
    };
}

macro_rules! write_array_impl {
    ($($name:ident, $ty:ty, $write:ident);* $(;)?) => {
        $(
            /// Writes all elements contiguously with no padding.
            pub fn $name(&mut self, values: &[$ty]) -> Result<()> {
                let mut bytes = Vec::with_capacity(values.len() * std::mem::size_of::<$ty>());
                for value in values {
                    bytes.$write::<LittleEndian>(*value)?;
                }
                self.writer.write_all(&bytes)?;
                Ok(())
            }
        )*
    };
}

impl<'a, W: Write + Seek> ChunkWriter<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.writer.stream_position()?)
    }

    /// Writes the header for a chunk with a placeholder length of `0`.
    /// The length is patched by [ChunkWriter::end_chunk].
    pub fn begin_chunk(&mut self, tag: u16) -> Result<OpenChunk> {
        let start = self.writer.stream_position()?;
        self.write_u16(tag)?;
        self.write_u32(0)?;
        Ok(OpenChunk { tag, start })
    }

    /// Seeks back to the header of `chunk`, writes the length of everything
    /// written since [ChunkWriter::begin_chunk], and seeks back to the end.
    pub fn end_chunk(&mut self, chunk: OpenChunk) -> Result<ChunkHeader> {
        let end = self.writer.stream_position()?;
        let length = u32::try_from(end - chunk.start).map_err(|_| {
            Error::ConstraintViolation(format!(
                "Chunk {:#06X} is {} bytes, which exceeds the maximum chunk length.",
                chunk.tag,
                end - chunk.start
            ))
        })?;

        self.writer.seek(SeekFrom::Start(chunk.start + 2))?;
        self.write_u32(length)?;
        self.writer.seek(SeekFrom::Start(end))?;

        Ok(ChunkHeader {
            tag: chunk.tag,
            length,
            offset: chunk.start as usize,
        })
    }

    /// Writes a complete chunk whose contents are written by `write_contents`.
    pub fn chunk<F>(&mut self, tag: u16, write_contents: F) -> Result<ChunkHeader>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let chunk = self.begin_chunk(tag)?;
        write_contents(self)?;
        self.end_chunk(chunk)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.writer.write_i8(value)?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    write_impl!(
        write_u16, u16, write_u16;
        write_i16, i16, write_i16;
        write_u32, u32, write_u32;
        write_i32, i32, write_i32;
        write_u64, u64, write_u64;
        write_i64, i64, write_i64;
        write_f32, f32, write_f32;
        write_f64, f64, write_f64;
    );

    write_array_impl!(
        write_u16_array, u16, write_u16;
        write_u32_array, u32, write_u32;
        write_f32_array, f32, write_f32;
    );

    pub fn write_vec3(&mut self, value: Vec3) -> Result<()> {
        self.write_f32_array(&value.to_array())
    }

    pub fn write_vec4(&mut self, value: Vec4) -> Result<()> {
        self.write_f32_array(&value.to_array())
    }

    /// Writes a quaternion in x, y, z, w order.
    pub fn write_quat(&mut self, value: Quat) -> Result<()> {
        self.write_f32_array(&value.to_array())
    }

    /// Writes the UTF-8 bytes of `value` followed by `delimiter`.
    pub fn write_delimited_string(&mut self, value: &str, delimiter: u8) -> Result<()> {
        if value.as_bytes().contains(&delimiter) {
            return Err(Error::ConstraintViolation(format!(
                "String {:?} contains the delimiter byte {:#04X}.",
                value, delimiter
            )));
        }
        self.write_bytes(value.as_bytes())?;
        self.write_u8(delimiter)
    }

    /// Writes a string terminated by a newline.
    pub fn write_line(&mut self, value: &str) -> Result<()> {
        self.write_delimited_string(value, LINE_DELIMITER)
    }

    /// Writes a string with a 4 byte packed length prefix.
    pub fn write_packed_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(&pack_length(value.len())?)?;
        self.write_bytes(value.as_bytes())
    }
}

/// Buffers the entire write operation into memory before writing the result to `writer`.
/// Patching chunk lengths seeks backwards, which is expensive for unbuffered files.
pub(crate) fn write_buffered<W: Write, F: FnOnce(&mut Cursor<Vec<u8>>) -> Result<()>>(
    writer: &mut W,
    write_data: F,
) -> Result<()> {
    let mut cursor = Cursor::new(Vec::new());
    write_data(&mut cursor)?;

    writer.write_all(cursor.get_ref())?;
    Ok(())
}

/// Creates the file at `path` and writes the buffered output of `write_data`.
pub(crate) fn write_to_file<P: AsRef<Path>, F: FnOnce(&mut Cursor<Vec<u8>>) -> Result<()>>(
    path: P,
    write_data: F,
) -> Result<()> {
    let mut file = File::create(path)?;
    write_buffered(&mut file, write_data)
}
