// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw geometry buffers as delivered by the room sensor
//!
//! A classified surface arrives as two byte buffers: a stride-addressed
//! vertex source and a triangle-list index element. Both are described by
//! counts the sensor reports; nothing here trusts those counts. Reads go
//! through bounds-checked accessors that return [`ConversionError`] instead
//! of touching memory past the end of the buffer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ConversionError, Result};

/// Size in bytes of one tightly packed `f32` position
pub const FLOAT3_SIZE: usize = 3 * std::mem::size_of::<f32>();

/// Largest vertex stride accepted when packing positions
pub const MAX_STRIDE: usize = 256;

/// Element layout of a vertex source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Three little-endian `f32` components
    Float3,
    /// Two-component positions; not usable as mesh positions
    Float2,
}

impl VertexFormat {
    /// Bytes read per element
    #[inline]
    pub fn element_size(self) -> usize {
        match self {
            VertexFormat::Float3 => FLOAT3_SIZE,
            VertexFormat::Float2 => 2 * std::mem::size_of::<f32>(),
        }
    }
}

/// Stride-addressed vertex buffer
///
/// Element `i` starts at `offset + i * stride`. The stride may be larger
/// than the element (16-byte SIMD layouts are common).
#[derive(Debug, Clone, PartialEq)]
pub struct VertexSource {
    pub buffer: Bytes,
    pub offset: usize,
    pub stride: usize,
    pub count: usize,
    pub format: VertexFormat,
}

impl VertexSource {
    /// Describe an existing buffer
    pub fn new(buffer: Bytes, offset: usize, stride: usize, count: usize, format: VertexFormat) -> Self {
        Self {
            buffer,
            offset,
            stride,
            count,
            format,
        }
    }

    /// Pack positions into a tight `Float3` buffer
    pub fn from_positions(positions: &[[f32; 3]]) -> Self {
        Self::pack(positions, FLOAT3_SIZE, positions.len().saturating_mul(FLOAT3_SIZE))
    }

    /// Pack positions with padding between elements
    ///
    /// A `stride` smaller than one element is raised to the element size.
    /// Strides above [`MAX_STRIDE`] are rejected.
    pub fn from_positions_with_stride(positions: &[[f32; 3]], stride: usize) -> Result<Self> {
        let stride = stride.max(FLOAT3_SIZE);
        if stride > MAX_STRIDE {
            return Err(ConversionError::UnsupportedFormat(format!(
                "vertex stride {} exceeds {}",
                stride, MAX_STRIDE
            )));
        }
        let len = positions.len().checked_mul(stride).ok_or_else(|| {
            ConversionError::UnsupportedFormat(format!("{} vertices of stride {} overflow", positions.len(), stride))
        })?;
        Ok(Self::pack(positions, stride, len))
    }

    fn pack(positions: &[[f32; 3]], stride: usize, len: usize) -> Self {
        let mut buf = BytesMut::with_capacity(len);
        for p in positions {
            buf.put_f32_le(p[0]);
            buf.put_f32_le(p[1]);
            buf.put_f32_le(p[2]);
            buf.put_bytes(0, stride - FLOAT3_SIZE);
        }
        Self::new(buf.freeze(), 0, stride, positions.len(), VertexFormat::Float3)
    }

    /// Check if the source has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.buffer.is_empty()
    }

    /// Read element `i` as a position
    pub fn read_float3(&self, i: usize) -> Result<[f32; 3]> {
        if self.format != VertexFormat::Float3 {
            return Err(ConversionError::UnsupportedFormat(format!(
                "vertex format {:?}, expected Float3",
                self.format
            )));
        }
        // Overlapping elements would let any count pass the bounds checks.
        if self.stride < self.format.element_size() {
            return Err(ConversionError::UnsupportedFormat(format!(
                "vertex stride {} is smaller than one {:?} element",
                self.stride, self.format
            )));
        }

        let start = i
            .checked_mul(self.stride)
            .and_then(|o| o.checked_add(self.offset))
            .ok_or_else(|| self.overrun(i, usize::MAX))?;
        let end = start
            .checked_add(FLOAT3_SIZE)
            .ok_or_else(|| self.overrun(i, usize::MAX))?;

        let bytes = self.buffer.get(start..end).ok_or_else(|| self.overrun(i, end))?;
        Ok([
            read_f32_le(&bytes[0..4]),
            read_f32_le(&bytes[4..8]),
            read_f32_le(&bytes[8..12]),
        ])
    }

    fn overrun(&self, element: usize, needed: usize) -> ConversionError {
        ConversionError::BufferOverrun {
            source_kind: "vertex",
            element,
            needed,
            available: self.buffer.len(),
        }
    }
}

/// Width of one index in an index element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    /// Bytes per index
    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Primitive topology of an index element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Triangle,
    Line,
}

impl PrimitiveKind {
    /// Indices consumed by one primitive
    #[inline]
    pub fn index_count(self) -> usize {
        match self {
            PrimitiveKind::Triangle => 3,
            PrimitiveKind::Line => 2,
        }
    }
}

/// Index buffer describing a primitive list
///
/// `count` is the number of primitives, not the number of indices.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexElement {
    pub buffer: Bytes,
    pub count: usize,
    pub width: IndexWidth,
    pub primitive: PrimitiveKind,
}

impl IndexElement {
    /// Describe an existing buffer
    pub fn new(buffer: Bytes, count: usize, width: IndexWidth, primitive: PrimitiveKind) -> Self {
        Self {
            buffer,
            count,
            width,
            primitive,
        }
    }

    /// Pack triangles into a 32-bit index buffer
    pub fn from_triangles(triangles: &[[u32; 3]]) -> Self {
        let mut buf = BytesMut::with_capacity(triangles.len() * 12);
        for t in triangles {
            for &i in t {
                buf.put_u32_le(i);
            }
        }
        Self::new(buf.freeze(), triangles.len(), IndexWidth::U32, PrimitiveKind::Triangle)
    }

    /// Pack triangles into a 16-bit index buffer
    pub fn from_triangles_u16(triangles: &[[u16; 3]]) -> Self {
        let mut buf = BytesMut::with_capacity(triangles.len() * 6);
        for t in triangles {
            for &i in t {
                buf.put_u16_le(i);
            }
        }
        Self::new(buf.freeze(), triangles.len(), IndexWidth::U16, PrimitiveKind::Triangle)
    }

    /// Check if the element has no primitives
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.buffer.is_empty()
    }

    /// Total number of indices the sensor claims
    #[inline]
    pub fn index_count(&self) -> Option<usize> {
        self.count.checked_mul(self.primitive.index_count())
    }

    /// Read index `i` (not primitive `i`)
    pub fn read_index(&self, i: usize) -> Result<u32> {
        let width = self.width.bytes();
        let end = i
            .checked_mul(width)
            .and_then(|s| s.checked_add(width))
            .ok_or_else(|| self.overrun(i, usize::MAX))?;
        let start = end - width;
        let bytes = self.buffer.get(start..end).ok_or_else(|| self.overrun(i, end))?;

        Ok(match self.width {
            IndexWidth::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
            IndexWidth::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    fn overrun(&self, element: usize, needed: usize) -> ConversionError {
        ConversionError::BufferOverrun {
            source_kind: "index",
            element,
            needed,
            available: self.buffer.len(),
        }
    }
}

#[inline]
fn read_f32_le(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_padded_stride() {
        let source = VertexSource::from_positions_with_stride(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], 16).unwrap();
        assert_eq!(source.buffer.len(), 32);
        assert_eq!(source.read_float3(1).unwrap(), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_oversized_stride_rejected_when_packing() {
        let positions = [[0.0, 0.0, 0.0]];
        assert!(VertexSource::from_positions_with_stride(&positions, MAX_STRIDE).is_ok());
        for stride in [MAX_STRIDE + 1, usize::MAX] {
            assert!(matches!(
                VertexSource::from_positions_with_stride(&positions, stride),
                Err(ConversionError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_overlapping_stride_rejected() {
        let source = VertexSource::new(Bytes::from(vec![0u8; 12]), 0, 0, 1_000, VertexFormat::Float3);
        assert!(matches!(source.read_float3(999), Err(ConversionError::UnsupportedFormat(_))));
        let source = VertexSource::new(Bytes::from(vec![0u8; 24]), 0, 8, 2, VertexFormat::Float3);
        assert!(source.read_float3(0).is_err());
    }

    #[test]
    fn test_vertex_overrun_is_an_error() {
        let mut source = VertexSource::from_positions(&[[0.0, 0.0, 0.0]]);
        source.count = 4;
        let err = source.read_float3(3).unwrap_err();
        assert!(matches!(err, ConversionError::BufferOverrun { source_kind: "vertex", element: 3, .. }));
    }

    #[test]
    fn test_offset_past_end() {
        let mut source = VertexSource::from_positions(&[[0.0, 0.0, 0.0]]);
        source.offset = usize::MAX - 4;
        assert!(source.read_float3(0).is_err());
    }

    #[test]
    fn test_u16_indices() {
        let element = IndexElement::from_triangles_u16(&[[0, 1, 2], [2, 1, 3]]);
        assert_eq!(element.index_count(), Some(6));
        assert_eq!(element.read_index(5).unwrap(), 3);
        assert!(element.read_index(6).is_err());
    }

    #[test]
    fn test_float2_rejected() {
        let source = VertexSource::new(Bytes::from_static(&[0u8; 8]), 0, 8, 1, VertexFormat::Float2);
        assert!(matches!(source.read_float3(0), Err(ConversionError::UnsupportedFormat(_))));
    }
}
