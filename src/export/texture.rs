//! In-memory texture objects built from readback data.

use crate::noise::DimensionClass;
use crate::pipeline::{OutputDescriptor, PixelFormat};
use super::ExportError;

/// A 2D or 3D RGBA8 texture.
///
/// While readable the texture keeps a CPU copy of its texels. Marking it
/// non-readable drops that copy; the shape stays queryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    dimension: DimensionClass,
    width: u32,
    height: u32,
    depth: u32,
    format: PixelFormat,
    pixels: Option<Vec<u8>>,
}

impl Texture {
    /// Creates a readable texture with zeroed texels.
    pub fn new(descriptor: &OutputDescriptor) -> Self {
        Self {
            dimension: descriptor.dimension,
            width: descriptor.width,
            height: descriptor.height,
            depth: descriptor.depth.max(1),
            format: descriptor.format,
            pixels: Some(vec![0; descriptor.byte_len()]),
        }
    }

    /// Creates a texture shaped like `descriptor` holding `bytes`.
    pub fn from_bytes(descriptor: &OutputDescriptor, bytes: &[u8]) -> Result<Self, ExportError> {
        let mut texture = Self::new(descriptor);
        texture.set_pixel_data(bytes)?;
        Ok(texture)
    }

    pub fn dimension(&self) -> DimensionClass {
        self.dimension
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn descriptor(&self) -> OutputDescriptor {
        OutputDescriptor {
            dimension: self.dimension,
            width: self.width,
            height: self.height,
            depth: self.depth,
            format: self.format,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.descriptor().byte_len()
    }

    pub fn is_readable(&self) -> bool {
        self.pixels.is_some()
    }

    /// Texel bytes, if the texture is still readable.
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// Replaces every texel. `bytes` must match the texture's size exactly.
    pub fn set_pixel_data(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        let expected = self.byte_len();
        if bytes.len() != expected {
            return Err(ExportError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = self.pixels.as_mut().ok_or(ExportError::NotReadable)?;
        pixels.copy_from_slice(bytes);
        Ok(())
    }

    /// Drops the CPU copy of the texels.
    pub fn make_no_longer_readable(&mut self) {
        self.pixels = None;
    }
}
