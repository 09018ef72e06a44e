//! A bounds checked, random access cursor over a fully buffered file.
//! All multi byte values are little endian.
use std::io::SeekFrom;

use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec3, Vec4};

use crate::strings::{unpack_length, LINE_DELIMITER, PACKED_LENGTH_SIZE};
use crate::{Error, Result};

/// Read cursor over a byte slice.
///
/// Reads fail with [Error::OutOfBounds] instead of returning partial values.
/// Use [Cursor::peek_byte] to test for the end of the data without failing.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_impl {
    ($($name:ident, $ty:ty, $read:ident);* $(;)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let bytes = self.take(std::mem::size_of::<$ty>(), stringify!($name))?;
                Ok(LittleEndian::$read(bytes))
            }
        )*
    };
}

macro_rules! read_array_impl {
    ($($name:ident, $ty:ty, $read_into:ident);* $(;)?) => {
        $(
            /// Reads exactly `count` contiguous elements with no padding.
            pub fn $name(&mut self, count: usize) -> Result<Vec<$ty>> {
                let size = self.array_size(count, std::mem::size_of::<$ty>(), stringify!($name))?;
                let bytes = self.take(size, stringify!($name))?;
                let mut values = vec![<$ty>::default(); count];
                LittleEndian::$read_into(bytes, &mut values);
                Ok(values)
            }
        )*
    };
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The total length of the underlying data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there are no bytes left to read.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The number of bytes from the current position to the end.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Moves the cursor and returns the new position.
    /// The resolved position must lie within `0..=len`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<usize> {
        let (base, offset) = match pos {
            SeekFrom::Start(offset) => (0i128, offset as i128),
            SeekFrom::Current(offset) => (self.pos as i128, offset as i128),
            SeekFrom::End(offset) => (self.data.len() as i128, offset as i128),
        };

        let target = base + offset;
        if target < 0 || target > self.data.len() as i128 {
            return Err(Error::OutOfBounds {
                operation: "seek",
                position: target.max(0) as usize,
                length: self.data.len(),
            });
        }

        self.pos = target as usize;
        Ok(self.pos)
    }

    /// Skips `count` bytes forward.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count, "skip")?;
        Ok(())
    }

    /// Returns the next byte without advancing or [None] at the end of the data.
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Reads `count` bytes without copying.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count, "read_bytes")
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.take(1, "read_u8")?;
        Ok(bytes[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let bytes = self.take(1, "read_i8")?;
        Ok(bytes[0] as i8)
    }

    /// Reads a single byte where any non zero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        let bytes = self.take(1, "read_bool")?;
        Ok(bytes[0] != 0)
    }

    read_impl!(
        read_u16, u16, read_u16;
        read_i16, i16, read_i16;
        read_u32, u32, read_u32;
        read_i32, i32, read_i32;
        read_u64, u64, read_u64;
        read_i64, i64, read_i64;
        read_f32, f32, read_f32;
        read_f64, f64, read_f64;
    );

    read_array_impl!(
        read_u16_array, u16, read_u16_into;
        read_u32_array, u32, read_u32_into;
        read_f32_array, f32, read_f32_into;
    );

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let bytes = self.take(12, "read_vec3")?;
        let mut values = [0f32; 3];
        LittleEndian::read_f32_into(bytes, &mut values);
        Ok(Vec3::from(values))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        let bytes = self.take(16, "read_vec4")?;
        let mut values = [0f32; 4];
        LittleEndian::read_f32_into(bytes, &mut values);
        Ok(Vec4::from(values))
    }

    /// Reads a quaternion stored in x, y, z, w order.
    pub fn read_quat(&mut self) -> Result<Quat> {
        let bytes = self.take(16, "read_quat")?;
        let mut values = [0f32; 4];
        LittleEndian::read_f32_into(bytes, &mut values);
        Ok(Quat::from_xyzw(values[0], values[1], values[2], values[3]))
    }

    /// Reads UTF-8 bytes up to `delimiter` and consumes the delimiter.
    /// There is no length limit, so a missing delimiter reads to the end of the data and fails.
    pub fn read_delimited_string(&mut self, delimiter: u8) -> Result<String> {
        let offset = self.pos;
        let length = self.data[self.pos.min(self.data.len())..]
            .iter()
            .position(|b| *b == delimiter)
            .ok_or(Error::OutOfBounds {
                operation: "read_delimited_string",
                position: self.data.len(),
                length: self.data.len(),
            })?;

        let bytes = self.take(length, "read_delimited_string")?;
        self.pos += 1;
        String::from_utf8(bytes.to_vec()).map_err(|source| Error::InvalidString { offset, source })
    }

    /// Reads a string terminated by a newline.
    pub fn read_line(&mut self) -> Result<String> {
        self.read_delimited_string(LINE_DELIMITER)
    }

    /// Reads a string with a 4 byte packed length prefix.
    /// See [crate::strings] for the length encoding.
    pub fn read_packed_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let prefix = self.take(PACKED_LENGTH_SIZE, "read_packed_string")?;
        let length = unpack_length([prefix[0], prefix[1], prefix[2], prefix[3]]);
        let bytes = self.take(length, "read_packed_string")?;
        String::from_utf8(bytes.to_vec()).map_err(|source| Error::InvalidString { offset, source })
    }

    fn array_size(&self, count: usize, width: usize, operation: &'static str) -> Result<usize> {
        count.checked_mul(width).ok_or(Error::OutOfBounds {
            operation,
            position: self.pos,
            length: self.data.len(),
        })
    }

    fn take(&mut self, count: usize, operation: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::OutOfBounds {
                operation,
                position: self.pos,
                length: self.data.len(),
            })?;

        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlit::hex;

    #[test]
    fn read_integers() {
        let data = hex!("01 0200 03000000 0400000000000000");
        let mut reader = Cursor::new(&data);
        assert_eq!(1, reader.read_u8().unwrap());
        assert_eq!(2, reader.read_u16().unwrap());
        assert_eq!(3, reader.read_u32().unwrap());
        assert_eq!(4, reader.read_u64().unwrap());
        assert!(reader.is_eof());
    }

    #[test]
    fn read_signed_integers() {
        let data = hex!("FF FEFF FDFFFFFF FCFFFFFFFFFFFFFF");
        let mut reader = Cursor::new(&data);
        assert_eq!(-1, reader.read_i8().unwrap());
        assert_eq!(-2, reader.read_i16().unwrap());
        assert_eq!(-3, reader.read_i32().unwrap());
        assert_eq!(-4, reader.read_i64().unwrap());
    }

    #[test]
    fn read_floats() {
        let data = hex!("0000803F 000000000000E03F");
        let mut reader = Cursor::new(&data);
        assert_eq!(1.0f32, reader.read_f32().unwrap());
        assert_eq!(0.5f64, reader.read_f64().unwrap());
    }

    #[test]
    fn read_i32_near_end_out_of_bounds() {
        let data = hex!("00000000 000000");
        let mut reader = Cursor::new(&data);
        reader.seek(SeekFrom::Start(data.len() as u64 - 3)).unwrap();

        let result = reader.read_i32();
        assert!(matches!(
            result,
            Err(Error::OutOfBounds {
                operation: "read_i32",
                position: 4,
                length: 7
            })
        ));
        // A failed read doesn't move the cursor.
        assert_eq!(4, reader.position());
    }

    #[test]
    fn read_vectors() {
        let data = hex!(
            "0000803F 000000C0 0000003F
             00000000 00000000 00000000 0000803F"
        );
        let mut reader = Cursor::new(&data);
        assert_eq!(Vec3::new(1.0, -2.0, 0.5), reader.read_vec3().unwrap());
        assert_eq!(Quat::IDENTITY, reader.read_quat().unwrap());
    }

    #[test]
    fn read_arrays() {
        let data = hex!("01000200 0300");
        let mut reader = Cursor::new(&data);
        assert_eq!(vec![1u16, 2u16, 3u16], reader.read_u16_array(3).unwrap());
        assert!(reader.read_u16_array(1).is_err());
    }

    #[test]
    fn read_array_count_overflow() {
        let data = hex!("01020304");
        let mut reader = Cursor::new(&data);
        assert!(reader.read_u32_array(usize::MAX).is_err());
    }

    #[test]
    fn read_line_consumes_delimiter() {
        let data = b"[Serializer_v1.10]\nabc";
        let mut reader = Cursor::new(data);
        assert_eq!("[Serializer_v1.10]", reader.read_line().unwrap());
        assert_eq!(19, reader.position());
    }

    #[test]
    fn read_delimited_string_custom_delimiter() {
        let data = b"a,b";
        let mut reader = Cursor::new(data);
        assert_eq!("a", reader.read_delimited_string(b',').unwrap());
        assert_eq!(Some(b'b'), reader.peek_byte());
    }

    #[test]
    fn read_line_missing_delimiter() {
        let data = b"abc";
        let mut reader = Cursor::new(data);
        assert!(reader.read_line().is_err());
        assert_eq!(0, reader.position());
    }

    #[test]
    fn read_line_invalid_utf8() {
        let data = hex!("FF0A");
        let mut reader = Cursor::new(&data);
        assert!(matches!(
            reader.read_line(),
            Err(Error::InvalidString { offset: 0, .. })
        ));
    }

    #[test]
    fn read_packed_string() {
        let data = hex!("00000003 616263 FF");
        let mut reader = Cursor::new(&data);
        assert_eq!("abc", reader.read_packed_string().unwrap());
        assert_eq!(7, reader.position());
    }

    #[test]
    fn peek_byte_at_end() {
        let data = hex!("01");
        let mut reader = Cursor::new(&data);
        assert_eq!(Some(1), reader.peek_byte());
        reader.skip(1).unwrap();
        assert_eq!(None, reader.peek_byte());
    }

    #[test]
    fn seek_origins() {
        let data = hex!("00010203");
        let mut reader = Cursor::new(&data);
        assert_eq!(3, reader.seek(SeekFrom::Start(3)).unwrap());
        assert_eq!(1, reader.seek(SeekFrom::Current(-2)).unwrap());
        assert_eq!(2, reader.seek(SeekFrom::End(-2)).unwrap());
        assert_eq!(4, reader.seek(SeekFrom::End(0)).unwrap());
    }

    #[test]
    fn seek_out_of_bounds() {
        let data = hex!("00010203");
        let mut reader = Cursor::new(&data);
        assert!(reader.seek(SeekFrom::Start(5)).is_err());
        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
        assert!(reader.seek(SeekFrom::End(1)).is_err());
        assert_eq!(0, reader.position());
    }
}
