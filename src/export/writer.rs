//! Turns readback buffers into persisted outputs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::noise::DimensionClass;
use crate::pipeline::{HostBuffer, OutputDescriptor};
use super::png::{encode_texture_png, PngExportOptions};
use super::store::AssetStore;
use super::texture::Texture;
use super::ExportError;

/// What a successful write produced.
#[derive(Debug)]
pub enum WriteOutcome {
    /// A PNG was written; no texture is retained.
    ImageWritten { path: PathBuf },
    /// A texture asset was persisted and is handed back to the caller.
    AssetPersisted { path: PathBuf, texture: Texture },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::ImageWritten { path } | WriteOutcome::AssetPersisted { path, .. } => path,
        }
    }
}

/// Appends `.{extension}` to `path` without replacing an existing one.
pub fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(".");
    os.push(extension);
    PathBuf::from(os)
}

pub struct AssetWriter<S: AssetStore> {
    store: Arc<S>,
    png: PngExportOptions,
}

impl<S: AssetStore> AssetWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            png: PngExportOptions::default(),
        }
    }

    pub fn with_png_options(mut self, png: PngExportOptions) -> Self {
        self.png = png;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Persists `host` according to its dimension and `encode_as_image`.
    ///
    /// * 2D + image: `{output_path}.png`, texture discarded.
    /// * 2D: `{output_path}.asset`, texture stays readable.
    /// * 3D: `{output_path}.asset`, texture made non-readable after saving.
    pub fn write(
        &self,
        host: &HostBuffer,
        descriptor: &OutputDescriptor,
        output_path: &Path,
        encode_as_image: bool,
    ) -> Result<WriteOutcome, ExportError> {
        let mut texture = Texture::from_bytes(descriptor, host.as_bytes())?;

        match descriptor.dimension {
            DimensionClass::D2 if encode_as_image => {
                let path = with_appended_extension(output_path, "png");
                let png = encode_texture_png(&texture, &self.png)?;
                self.store.write_bytes(&path, &png)?;
                self.store.refresh()?;
                log::info!("PNG saved to: {}", path.display());
                texture.make_no_longer_readable();
                drop(texture);
                Ok(WriteOutcome::ImageWritten { path })
            }
            DimensionClass::D2 => {
                let path = with_appended_extension(output_path, "asset");
                self.store.create_asset(&texture, &path)?;
                self.store.save_if_dirty(&path)?;
                log::info!("Texture2D saved to: {}", path.display());
                Ok(WriteOutcome::AssetPersisted { path, texture })
            }
            DimensionClass::D3 => {
                if encode_as_image {
                    log::debug!("PNG encoding is not available for volumes; writing an asset instead");
                }
                let path = with_appended_extension(output_path, "asset");
                self.store.create_asset(&texture, &path)?;
                self.store.save_if_dirty(&path)?;
                texture.make_no_longer_readable();
                log::info!("Texture3D saved to: {}", path.display());
                Ok(WriteOutcome::AssetPersisted { path, texture })
            }
        }
    }
}
