//! Chunk framing shared by the mesh and skeleton formats.
//!
//! Every chunk starts with a `u16` tag and a `u32` length that includes the 6 byte header.
//! Lengths are treated as authoritative. A handler may not read past the end of its chunk,
//! and any bytes it leaves unread are skipped.
//!
//! Grammar productions decide whether a chunk belongs to them by looking at its tag.
//! [ChunkReader] keeps a single header of lookahead so a production can read the next header,
//! decide it belongs to its caller instead, and push it back.
use std::io::{Seek, SeekFrom, Write};

use crate::cursor::Cursor;
use crate::export::ChunkWriter;
use crate::{Error, Result};

/// The size in bytes of the tag and length preceding every chunk body.
pub const CHUNK_HEADER_SIZE: usize = 6;

/// The tag of the file header shared by mesh and skeleton files.
pub const HEADER_CHUNK_ID: u16 = 0x1000;

/// The tag and length of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: u16,
    /// The length of the chunk in bytes including the header.
    pub length: u32,
    /// The absolute offset of the start of the header.
    pub offset: usize,
}

impl ChunkHeader {
    /// The absolute offset of the first byte after the header.
    pub fn body_offset(&self) -> usize {
        self.offset + CHUNK_HEADER_SIZE
    }

    /// The absolute offset of the first byte after the chunk.
    pub fn end(&self) -> usize {
        self.offset + self.length as usize
    }

    /// The length of the chunk excluding the header.
    pub fn body_length(&self) -> usize {
        self.length as usize - CHUNK_HEADER_SIZE
    }
}

/// A [Cursor] with one chunk header of lookahead.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    cursor: Cursor<'a>,
    lookahead: Option<ChunkHeader>,
    last: Option<ChunkHeader>,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            lookahead: None,
            last: None,
        }
    }

    /// The cursor for reading chunk bodies.
    /// Bodies must not be read while a header is pushed back.
    pub fn cursor(&mut self) -> &mut Cursor<'a> {
        debug_assert!(
            self.lookahead.is_none(),
            "chunk body read with a pending header"
        );
        &mut self.cursor
    }

    /// The logical read position.
    /// A pushed back header counts as unread.
    pub fn position(&self) -> usize {
        match self.lookahead {
            Some(header) => header.offset,
            None => self.cursor.position(),
        }
    }

    /// Returns `true` if there are no more bytes or pushed back headers to read.
    pub fn is_eof(&self) -> bool {
        self.lookahead.is_none() && self.cursor.is_eof()
    }

    /// Reads the next chunk header or returns the header pushed back by [ChunkReader::backtrack_one_header].
    pub fn read_chunk_header(&mut self) -> Result<ChunkHeader> {
        if let Some(header) = self.lookahead.take() {
            self.last = Some(header);
            return Ok(header);
        }

        let offset = self.cursor.position();
        let tag = self.cursor.read_u16()?;
        let length = self.cursor.read_u32()?;

        if (length as usize) < CHUNK_HEADER_SIZE {
            return Err(Error::ConstraintViolation(format!(
                "Chunk {:#06X} at offset {} has length {}, which is smaller than the chunk header.",
                tag, offset, length
            )));
        }

        let header = ChunkHeader {
            tag,
            length,
            offset,
        };
        if header.end() > self.cursor.len() {
            return Err(Error::OutOfBounds {
                operation: "read_chunk_header",
                position: header.end(),
                length: self.cursor.len(),
            });
        }

        self.last = Some(header);
        Ok(header)
    }

    /// Pushes back the most recently read header so the next call to
    /// [ChunkReader::read_chunk_header] returns it again.
    /// Does nothing if no header has been read since the last backtrack.
    pub fn backtrack_one_header(&mut self) {
        if let Some(header) = self.last.take() {
            self.lookahead = Some(header);
        }
    }

    /// Returns the next header without consuming it or [None] at the end of the data.
    pub fn peek_chunk_header(&mut self) -> Result<Option<ChunkHeader>> {
        if self.is_eof() {
            return Ok(None);
        }

        let header = self.read_chunk_header()?;
        self.backtrack_one_header();
        Ok(Some(header))
    }

    /// Consumes the next header if its tag is in `expected`.
    /// Headers with other tags are pushed back for the caller to examine.
    pub fn next_chunk_in(&mut self, expected: &[u16]) -> Result<Option<ChunkHeader>> {
        if self.is_eof() {
            return Ok(None);
        }

        let header = self.read_chunk_header()?;
        if expected.contains(&header.tag) {
            Ok(Some(header))
        } else {
            self.backtrack_one_header();
            Ok(None)
        }
    }

    /// Consumes the next header and checks that its tag is `expected`.
    pub fn expect_chunk(&mut self, expected: u16) -> Result<ChunkHeader> {
        let offset = self.position();
        if self.is_eof() {
            return Err(Error::UnexpectedChunk {
                expected,
                found: None,
                offset,
            });
        }

        let header = self.read_chunk_header()?;
        if header.tag != expected {
            self.backtrack_one_header();
            return Err(Error::UnexpectedChunk {
                expected,
                found: Some(header.tag),
                offset,
            });
        }
        Ok(header)
    }

    /// Consumes a required child chunk that must lie within a parent ending at `parent_end`.
    pub fn expect_child_chunk(&mut self, parent_end: usize, expected: u16) -> Result<ChunkHeader> {
        if self.position() >= parent_end {
            return Err(Error::UnexpectedChunk {
                expected,
                found: None,
                offset: self.position(),
            });
        }

        let header = self.expect_chunk(expected)?;
        if header.end() > parent_end {
            return Err(Error::ConstraintViolation(format!(
                "Chunk {:#06X} at offset {} extends {} bytes past the end of its parent.",
                header.tag,
                header.offset,
                header.end() - parent_end
            )));
        }
        Ok(header)
    }

    /// The number of unread bytes left in the body of `header`.
    pub fn remaining_in(&self, header: &ChunkHeader) -> usize {
        header.end().saturating_sub(self.position())
    }

    /// Checks that the body of `header` was not overrun and skips any unread bytes.
    pub fn finish_chunk(&mut self, header: &ChunkHeader) -> Result<()> {
        let position = self.position();
        if position > header.end() {
            return Err(Error::ConstraintViolation(format!(
                "Read {} bytes past the end of chunk {:#06X} at offset {}.",
                position - header.end(),
                header.tag,
                header.offset
            )));
        }

        if position < header.end() {
            tracing::trace!(
                "Skipping {} unread bytes in chunk {:#06X}",
                header.end() - position,
                header.tag
            );
        }

        self.lookahead = None;
        self.cursor.seek(SeekFrom::Start(header.end() as u64))?;
        Ok(())
    }

    /// Reads the body of `header` with `read_body` and moves to the end of the chunk.
    pub fn read_chunk_body<T, F>(&mut self, header: &ChunkHeader, read_body: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let value = read_body(self)?;
        self.finish_chunk(header)?;
        Ok(value)
    }

    /// Reads every child chunk from the current position up to `end`.
    /// Chunks tagged with one of `expected` are passed to `read_child`.
    /// Other tags are skipped using their length.
    pub fn read_child_chunks<F>(&mut self, end: usize, expected: &[u16], mut read_child: F) -> Result<()>
    where
        F: FnMut(&mut Self, ChunkHeader) -> Result<()>,
    {
        while self.position() < end {
            let header = self.read_chunk_header()?;
            if header.end() > end {
                return Err(Error::ConstraintViolation(format!(
                    "Chunk {:#06X} at offset {} extends {} bytes past the end of its parent.",
                    header.tag,
                    header.offset,
                    header.end() - end
                )));
            }

            if expected.contains(&header.tag) {
                read_child(self, header)?;
            } else {
                tracing::debug!(
                    "Skipping unrecognized chunk {:#06X} at offset {}",
                    header.tag,
                    header.offset
                );
            }
            self.finish_chunk(&header)?;
        }
        Ok(())
    }
}

/// Reads the file header and returns the version string.
/// The header is a [HEADER_CHUNK_ID] tag followed by a newline terminated version with no length field.
pub fn read_file_header(reader: &mut ChunkReader) -> Result<String> {
    let cursor = reader.cursor();
    let tag = cursor
        .read_u16()
        .map_err(|_| Error::MalformedHeader("The file is too short to contain a header.".into()))?;
    if tag != HEADER_CHUNK_ID {
        return Err(Error::MalformedHeader(format!(
            "Expected header tag {:#06X} but found {:#06X}.",
            HEADER_CHUNK_ID, tag
        )));
    }

    cursor
        .read_line()
        .map_err(|e| Error::MalformedHeader(format!("Failed to read the version string: {}", e)))
}

/// Reads the file header and checks that the version matches `expected`.
pub fn expect_file_header(reader: &mut ChunkReader, expected: &str) -> Result<()> {
    let version = read_file_header(reader)?;
    if version != expected {
        return Err(Error::MalformedHeader(format!(
            "Invalid file version {:?}. Expected {:?}.",
            version, expected
        )));
    }
    Ok(())
}

pub fn write_file_header<W: Write + Seek>(writer: &mut ChunkWriter<W>, version: &str) -> Result<()> {
    writer.write_u16(HEADER_CHUNK_ID)?;
    writer.write_line(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlit::hex;

    #[test]
    fn backtrack_one_header_rereads_same_header() {
        let data = hex!("0030 0A000000 01020304");
        let mut reader = ChunkReader::new(&data);

        let before = reader.position();
        let header = reader.read_chunk_header().unwrap();
        assert_eq!(6, reader.position());

        reader.backtrack_one_header();
        assert_eq!(before, reader.position());
        assert!(!reader.is_eof());

        assert_eq!(header, reader.read_chunk_header().unwrap());
        assert_eq!(
            ChunkHeader {
                tag: 0x3000,
                length: 10,
                offset: 0
            },
            header
        );
    }

    #[test]
    fn backtrack_without_header_does_nothing() {
        let data = hex!("0030 06000000");
        let mut reader = ChunkReader::new(&data);
        reader.backtrack_one_header();
        assert_eq!(0, reader.position());
    }

    #[test]
    fn next_chunk_in_pushes_back_other_tags() {
        let data = hex!("0040 06000000 0050 06000000");
        let mut reader = ChunkReader::new(&data);

        assert_eq!(None, reader.next_chunk_in(&[0x5000]).unwrap());
        assert_eq!(0, reader.position());

        let header = reader.next_chunk_in(&[0x4000]).unwrap().unwrap();
        assert_eq!(0x4000, header.tag);
        reader.finish_chunk(&header).unwrap();

        let header = reader.next_chunk_in(&[0x4000, 0x5000]).unwrap().unwrap();
        assert_eq!(0x5000, header.tag);
        reader.finish_chunk(&header).unwrap();

        assert!(reader.is_eof());
        assert_eq!(None, reader.next_chunk_in(&[0x4000]).unwrap());
    }

    #[test]
    fn peek_chunk_header_at_end() {
        let data: [u8; 0] = [];
        let mut reader = ChunkReader::new(&data);
        assert_eq!(None, reader.peek_chunk_header().unwrap());
    }

    #[test]
    fn read_chunk_header_length_too_small() {
        let data = hex!("0030 05000000");
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            reader.read_chunk_header(),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn read_chunk_header_truncated_body() {
        let data = hex!("0030 0A000000 0102");
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            reader.read_chunk_header(),
            Err(Error::OutOfBounds { length: 8, .. })
        ));
    }

    #[test]
    fn expect_chunk_wrong_tag() {
        let data = hex!("0040 06000000");
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            reader.expect_chunk(0x5000),
            Err(Error::UnexpectedChunk {
                expected: 0x5000,
                found: Some(0x4000),
                offset: 0
            })
        ));
    }

    #[test]
    fn expect_chunk_at_end() {
        let data: [u8; 0] = [];
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            reader.expect_chunk(0x5000),
            Err(Error::UnexpectedChunk { found: None, .. })
        ));
    }

    #[test]
    fn expect_child_chunk_at_parent_end() {
        let data = hex!("0030 06000000 0040 06000000");
        let mut reader = ChunkReader::new(&data);
        let parent = reader.read_chunk_header().unwrap();
        assert!(matches!(
            reader.expect_child_chunk(parent.end(), 0x4000),
            Err(Error::UnexpectedChunk {
                expected: 0x4000,
                found: None,
                offset: 6
            })
        ));
    }

    #[test]
    fn finish_chunk_skips_unread_bytes() {
        let data = hex!("0030 0A000000 01020304 FF");
        let mut reader = ChunkReader::new(&data);
        let header = reader.read_chunk_header().unwrap();
        assert_eq!(1, reader.cursor().read_u8().unwrap());
        assert_eq!(3, reader.remaining_in(&header));
        reader.finish_chunk(&header).unwrap();
        assert_eq!(10, reader.position());
    }

    #[test]
    fn finish_chunk_overrun() {
        let data = hex!("0030 07000000 01020304");
        let mut reader = ChunkReader::new(&data);
        let header = reader.read_chunk_header().unwrap();
        reader.cursor().read_u32().unwrap();
        assert!(matches!(
            reader.finish_chunk(&header),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn read_child_chunks_skips_unknown_tags() {
        let data = hex!(
            "0030 1A000000
                0050 07000000 01
                0099 06000000
                0050 07000000 02
             0060 06000000"
        );
        let mut reader = ChunkReader::new(&data);
        let parent = reader.read_chunk_header().unwrap();

        let mut values = Vec::new();
        reader
            .read_child_chunks(parent.end(), &[0x5000], |r, _| {
                values.push(r.cursor().read_u8()?);
                Ok(())
            })
            .unwrap();

        assert_eq!(vec![1, 2], values);
        assert_eq!(parent.end(), reader.position());
    }

    #[test]
    fn read_child_chunks_child_past_parent() {
        let data = hex!("0030 0C000000 0050 08000000 0000");
        let mut reader = ChunkReader::new(&data);
        let parent = reader.read_chunk_header().unwrap();
        let result = reader.read_child_chunks(parent.end(), &[0x5000], |_, _| Ok(()));
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));
    }

    #[test]
    fn read_file_header_version() {
        let data = hex!("0010 5B53657269616C697A65725F76312E31305D 0A");
        let mut reader = ChunkReader::new(&data);
        assert_eq!("[Serializer_v1.10]", read_file_header(&mut reader).unwrap());
        assert!(reader.is_eof());
    }

    #[test]
    fn read_file_header_wrong_tag() {
        let data = hex!("0030 0A");
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            read_file_header(&mut reader),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn expect_file_header_wrong_version() {
        let data = hex!("0010 5B53657269616C697A65725F76312E30305D 0A");
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            expect_file_header(&mut reader, "[Serializer_v1.10]"),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn write_file_header_bytes() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        write_file_header(&mut ChunkWriter::new(&mut cursor), "[Serializer_v1.10]").unwrap();
        assert_eq!(
            hex!("0010 5B53657269616C697A65725F76312E31305D 0A").to_vec(),
            cursor.into_inner()
        );
    }
}
