//! Vertex declarations and the raw vertex buffers they describe.
//!
//! A [VertexData] owns one buffer per bind index.
//! Each [VertexElement] in the declaration points into one of those buffers
//! using a byte offset within the vertex, and every buffer has a fixed stride.
use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The data type of a single vertex attribute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum VertexElementType {
    Float1 = 0,
    Float2 = 1,
    Float3 = 2,
    Float4 = 3,
    /// A packed colour in the render system's native byte order.
    Colour = 4,
    Short1 = 5,
    Short2 = 6,
    Short3 = 7,
    Short4 = 8,
    UByte4 = 9,
    ColourArgb = 10,
    ColourAbgr = 11,
}

impl VertexElementType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::Float1 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Colour | Self::ColourArgb | Self::ColourAbgr => 4,
            Self::Short1 => 2,
            Self::Short2 => 4,
            Self::Short3 => 6,
            Self::Short4 => 8,
            Self::UByte4 => 4,
        }
    }

    /// The number of components for float types or [None] for other types.
    pub fn float_components(self) -> Option<usize> {
        match self {
            Self::Float1 => Some(1),
            Self::Float2 => Some(2),
            Self::Float3 => Some(3),
            Self::Float4 => Some(4),
            _ => None,
        }
    }

    /// The float type with `components` components.
    pub fn float(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Float1),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }

    pub fn is_colour(self) -> bool {
        matches!(self, Self::Colour | Self::ColourArgb | Self::ColourAbgr)
    }
}

impl TryFrom<u16> for VertexElementType {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Float1),
            1 => Ok(Self::Float2),
            2 => Ok(Self::Float3),
            3 => Ok(Self::Float4),
            4 => Ok(Self::Colour),
            5 => Ok(Self::Short1),
            6 => Ok(Self::Short2),
            7 => Ok(Self::Short3),
            8 => Ok(Self::Short4),
            9 => Ok(Self::UByte4),
            10 => Ok(Self::ColourArgb),
            11 => Ok(Self::ColourAbgr),
            _ => Err(Error::ConstraintViolation(format!(
                "Unrecognized vertex element type {}.",
                value
            ))),
        }
    }
}

/// The meaning of a vertex attribute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum VertexElementSemantic {
    Position = 1,
    BlendWeights = 2,
    BlendIndices = 3,
    Normal = 4,
    Diffuse = 5,
    Specular = 6,
    TextureCoordinates = 7,
    Binormal = 8,
    Tangent = 9,
}

impl TryFrom<u16> for VertexElementSemantic {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::Position),
            2 => Ok(Self::BlendWeights),
            3 => Ok(Self::BlendIndices),
            4 => Ok(Self::Normal),
            5 => Ok(Self::Diffuse),
            6 => Ok(Self::Specular),
            7 => Ok(Self::TextureCoordinates),
            8 => Ok(Self::Binormal),
            9 => Ok(Self::Tangent),
            _ => Err(Error::ConstraintViolation(format!(
                "Unrecognized vertex element semantic {}.",
                value
            ))),
        }
    }
}

/// A single entry in a vertex declaration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    /// The bind index of the [VertexBuffer] containing the data.
    pub source: u16,
    pub element_type: VertexElementType,
    pub semantic: VertexElementSemantic,
    /// The offset in bytes from the start of each vertex.
    pub offset: u16,
    /// Distinguishes multiple elements with the same semantic like texture coordinate sets.
    pub index: u16,
}

impl VertexElement {
    pub fn size_in_bytes(&self) -> usize {
        self.element_type.size_in_bytes()
    }
}

/// Raw interleaved vertex data for a single bind index.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBuffer {
    /// The stride in bytes between consecutive vertices.
    pub vertex_size: u16,
    #[cfg_attr(feature = "serde", serde(with = "hex::serde"))]
    pub data: Vec<u8>,
}

/// A vertex declaration and the buffers it describes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexData {
    pub vertex_count: u32,
    /// The vertex declaration in file order.
    pub elements: Vec<VertexElement>,
    /// The vertex buffers keyed by bind index.
    pub buffers: BTreeMap<u16, VertexBuffer>,
}

impl VertexData {
    pub fn new(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            elements: Vec::new(),
            buffers: BTreeMap::new(),
        }
    }

    /// The size in bytes of a single vertex in buffer `source` computed from the declaration.
    pub fn declared_vertex_size(&self, source: u16) -> usize {
        self.elements
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.size_in_bytes())
            .sum()
    }

    /// Finds the element with the given `semantic` and `index`.
    pub fn find_element(
        &self,
        semantic: VertexElementSemantic,
        index: u16,
    ) -> Option<&VertexElement> {
        self.elements
            .iter()
            .find(|e| e.semantic == semantic && e.index == index)
    }

    /// The bind index that will be used by the next added element.
    fn next_source(&self) -> u16 {
        let max_element = self.elements.iter().map(|e| e.source + 1).max();
        let max_buffer = self.buffers.keys().map(|k| k + 1).max();
        max_element.max(max_buffer).unwrap_or(0)
    }

    /// Adds an element stored in its own buffer from non interleaved `bytes`.
    /// `bytes` must contain exactly [VertexData::vertex_count] values of `element_type`.
    pub fn add_element_bytes(
        &mut self,
        semantic: VertexElementSemantic,
        index: u16,
        element_type: VertexElementType,
        bytes: Vec<u8>,
    ) -> Result<&VertexElement> {
        let expected_size = self.vertex_count as usize * element_type.size_in_bytes();
        if bytes.len() != expected_size {
            return Err(Error::ConstraintViolation(format!(
                "Expected {} bytes for {} vertices of type {:?} but found {}.",
                expected_size,
                self.vertex_count,
                element_type,
                bytes.len()
            )));
        }

        let source = self.next_source();
        self.buffers.insert(
            source,
            VertexBuffer {
                vertex_size: element_type.size_in_bytes() as u16,
                data: bytes,
            },
        );
        self.elements.push(VertexElement {
            source,
            element_type,
            semantic,
            offset: 0,
            index,
        });
        Ok(&self.elements[self.elements.len() - 1])
    }

    /// Adds a float element with `N` components stored in its own buffer.
    /// There must be exactly one value for each vertex.
    pub fn add_float_element<const N: usize>(
        &mut self,
        semantic: VertexElementSemantic,
        index: u16,
        values: &[[f32; N]],
    ) -> Result<&VertexElement> {
        let element_type = VertexElementType::float(N).ok_or_else(|| {
            Error::ConstraintViolation(format!("Float elements cannot have {} components.", N))
        })?;

        let mut bytes = vec![0u8; values.len() * N * 4];
        for (value, chunk) in values.iter().zip(bytes.chunks_exact_mut(N * 4)) {
            LittleEndian::write_f32_into(value, chunk);
        }

        self.add_element_bytes(semantic, index, element_type, bytes)
    }

    /// Returns the bytes for `element` for each vertex without interleaving.
    pub fn read_element_bytes(&self, element: &VertexElement) -> Result<Vec<u8>> {
        let (buffer, stride) = self.element_buffer(element)?;
        let size = element.size_in_bytes();

        let mut bytes = Vec::with_capacity(self.vertex_count as usize * size);
        for i in 0..self.vertex_count as usize {
            let start = i * stride + element.offset as usize;
            let value = buffer.data.get(start..start + size).ok_or(Error::OutOfBounds {
                operation: "read_element_bytes",
                position: start + size,
                length: buffer.data.len(),
            })?;
            bytes.extend_from_slice(value);
        }
        Ok(bytes)
    }

    /// Decodes the float element with the given `semantic` and `index` or returns [None] if not present.
    /// The element's type must have exactly `N` components.
    pub fn read_float_element<const N: usize>(
        &self,
        semantic: VertexElementSemantic,
        index: u16,
    ) -> Result<Option<Vec<[f32; N]>>> {
        let element = match self.find_element(semantic, index) {
            Some(element) => element,
            None => return Ok(None),
        };

        if element.element_type.float_components() != Some(N) {
            return Err(Error::ConstraintViolation(format!(
                "Element {:?} {} has type {:?}, which does not have {} float components.",
                semantic, index, element.element_type, N
            )));
        }

        let bytes = self.read_element_bytes(element)?;
        let values = bytes
            .chunks_exact(N * 4)
            .map(|chunk| {
                let mut value = [0f32; N];
                LittleEndian::read_f32_into(chunk, &mut value);
                value
            })
            .collect();
        Ok(Some(values))
    }

    /// Decodes the first position element or returns [None] if there are no positions.
    pub fn positions(&self) -> Result<Option<Vec<Vec3>>> {
        let positions = self.read_float_element::<3>(VertexElementSemantic::Position, 0)?;
        Ok(positions.map(|p| p.into_iter().map(Vec3::from).collect()))
    }

    /// Reads the position of a single vertex using the position element's offset and buffer stride.
    pub fn position(&self, vertex_index: u32) -> Result<Vec3> {
        let element = self
            .find_element(VertexElementSemantic::Position, 0)
            .ok_or_else(|| Error::ConstraintViolation("Vertex data has no positions.".into()))?;
        if element.element_type != VertexElementType::Float3 {
            return Err(Error::ConstraintViolation(format!(
                "Expected positions of type {:?} but found {:?}.",
                VertexElementType::Float3,
                element.element_type
            )));
        }
        if vertex_index >= self.vertex_count {
            return Err(Error::ConstraintViolation(format!(
                "Vertex index {} is out of range for {} vertices.",
                vertex_index, self.vertex_count
            )));
        }

        let (buffer, stride) = self.element_buffer(element)?;
        let start = vertex_index as usize * stride + element.offset as usize;
        let bytes = buffer.data.get(start..start + 12).ok_or(Error::OutOfBounds {
            operation: "position",
            position: start + 12,
            length: buffer.data.len(),
        })?;

        let mut value = [0f32; 3];
        LittleEndian::read_f32_into(bytes, &mut value);
        Ok(Vec3::from(value))
    }

    fn element_buffer(&self, element: &VertexElement) -> Result<(&VertexBuffer, usize)> {
        let buffer = self.buffers.get(&element.source).ok_or_else(|| {
            Error::ConstraintViolation(format!(
                "No vertex buffer is bound to source {}.",
                element.source
            ))
        })?;
        Ok((buffer, buffer.vertex_size as usize))
    }
}
