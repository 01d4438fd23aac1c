//! Texture asset file format.
//!
//! Layout (little-endian):
//!
//! | field     | type     |
//! |-----------|----------|
//! | magic     | `b"NBTX"` |
//! | version   | u16      |
//! | dimension | u8 (2, 3) |
//! | format    | u8 (1 = RGBA8 UNorm) |
//! | width     | u32      |
//! | height    | u32      |
//! | depth     | u32      |
//! | texels    | width × height × depth × 4 bytes |

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::noise::DimensionClass;
use crate::pipeline::{OutputDescriptor, PixelFormat};
use super::texture::Texture;
use super::ExportError;

pub const ASSET_MAGIC: &[u8; 4] = b"NBTX";
pub const ASSET_VERSION: u16 = 1;
pub const ASSET_HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 * 3;

/// Serializes a readable texture into asset bytes.
pub fn serialize_texture(texture: &Texture) -> Result<Vec<u8>, ExportError> {
    let pixels = texture.pixels().ok_or(ExportError::NotReadable)?;
    let mut out = Vec::with_capacity(ASSET_HEADER_LEN + pixels.len());
    out.extend_from_slice(ASSET_MAGIC);
    out.extend_from_slice(&ASSET_VERSION.to_le_bytes());
    out.push(texture.dimension().tag());
    out.push(texture.format().tag());
    out.extend_from_slice(&texture.width().to_le_bytes());
    out.extend_from_slice(&texture.height().to_le_bytes());
    out.extend_from_slice(&texture.depth().to_le_bytes());
    out.extend_from_slice(pixels);
    Ok(out)
}

/// Parses only the header, returning the stored shape.
pub fn parse_header(bytes: &[u8]) -> Result<OutputDescriptor, ExportError> {
    if bytes.len() < ASSET_HEADER_LEN {
        return Err(ExportError::InvalidAsset(format!(
            "header needs {} bytes, got {}",
            ASSET_HEADER_LEN,
            bytes.len()
        )));
    }
    if &bytes[0..4] != ASSET_MAGIC {
        return Err(ExportError::InvalidAsset("bad magic".to_string()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != ASSET_VERSION {
        return Err(ExportError::InvalidAsset(format!("unsupported version {}", version)));
    }
    let dimension = DimensionClass::from_tag(bytes[6])
        .ok_or_else(|| ExportError::InvalidAsset(format!("unknown dimension tag {}", bytes[6])))?;
    let format = PixelFormat::from_tag(bytes[7])
        .ok_or_else(|| ExportError::InvalidAsset(format!("unknown format tag {}", bytes[7])))?;
    let read_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    let descriptor = OutputDescriptor {
        dimension,
        width: read_u32(8),
        height: read_u32(12),
        depth: read_u32(16),
        format,
    };
    let (w, h, d) = (descriptor.width, descriptor.height, descriptor.depth);
    if w == 0 || h == 0 || d == 0 {
        return Err(ExportError::InvalidAsset(format!("empty extent {}x{}x{}", w, h, d)));
    }
    if dimension == DimensionClass::D2 && d != 1 {
        return Err(ExportError::InvalidAsset(format!("2D texture with depth {}", d)));
    }
    if descriptor.checked_byte_len().is_none() {
        return Err(ExportError::InvalidAsset(format!("extent {}x{}x{} is too large", w, h, d)));
    }
    Ok(descriptor)
}

/// Parses asset bytes back into a readable texture.
pub fn deserialize_texture(bytes: &[u8]) -> Result<Texture, ExportError> {
    let descriptor = parse_header(bytes)?;
    let texels = &bytes[ASSET_HEADER_LEN..];
    if texels.len() != descriptor.byte_len() {
        return Err(ExportError::SizeMismatch {
            expected: descriptor.byte_len(),
            actual: texels.len(),
        });
    }
    Texture::from_bytes(&descriptor, texels)
}

/// Reads a texture asset file.
pub fn read_texture_asset(path: &Path) -> Result<Texture, ExportError> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    deserialize_texture(&bytes)
}

/// Returns the expected file size of an asset with the given shape.
pub fn expected_file_size(descriptor: &OutputDescriptor) -> u64 {
    ASSET_HEADER_LEN as u64 + descriptor.byte_len() as u64
}
