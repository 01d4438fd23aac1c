//! PNG encoding for 2D noise textures.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;

use crate::noise::DimensionClass;
use super::texture::Texture;
use super::ExportError;

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

/// Encodes a readable 2D RGBA8 texture as PNG bytes.
pub fn encode_texture_png(texture: &Texture, options: &PngExportOptions) -> Result<Vec<u8>, ExportError> {
    if texture.dimension() != DimensionClass::D2 {
        return Err(ExportError::Unsupported(
            "only 2D textures can be encoded as PNG".to_string(),
        ));
    }
    let pixels = texture.pixels().ok_or(ExportError::NotReadable)?;

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, options.compression, options.filter);
    encoder.write_image(
        pixels,
        texture.width(),
        texture.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}
