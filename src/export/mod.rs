//! Export module for persisting baked noise.
//!
//! 2D output can be written as an RGBA8 PNG or as a texture asset; 3D
//! output is always a volume texture asset.

mod asset;
mod png;
mod store;
mod texture;
mod writer;

use thiserror::Error;

use crate::gpu::BackendError;

pub use asset::{
    deserialize_texture, expected_file_size, parse_header, read_texture_asset, serialize_texture,
    ASSET_HEADER_LEN, ASSET_MAGIC, ASSET_VERSION,
};
pub use png::{encode_texture_png, PngExportOptions};
pub use store::{AssetStore, FsAssetStore};
pub use texture::Texture;
pub use writer::{with_appended_extension, AssetWriter, WriteOutcome};

/// Errors that can occur while persisting output.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("GPU readback failed: {0}")]
    Readback(#[from] BackendError),
    #[error("Texel data length {actual} != expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Texture is no longer readable")]
    NotReadable,
    #[error("Unsupported export: {0}")]
    Unsupported(String),
    #[error("Completion handler panicked: {0}")]
    HandlerPanicked(String),
    #[error("Invalid texture asset: {0}")]
    InvalidAsset(String),
}
