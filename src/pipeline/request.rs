//! Generation requests and their lifecycle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::noise::NoiseVariant;

/// Output path used when a request does not name one.
pub const DEFAULT_OUTPUT_PATH: &str = "Noise/NoiseGeneratorOutput";

/// Everything needed to bake one noise texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    pub variant: NoiseVariant,
    pub width: u32,
    pub height: u32,
    /// Only read for 3D variants.
    pub depth: u32,
    /// Perlin/Simplex frequency.
    pub scale: f32,
    /// Voronoi cells per unit.
    pub cell_density: f32,
    /// Voronoi feature-point rotation.
    pub angle_offset: f32,
    pub seed: String,
    /// Destination without extension; `.png` or `.asset` is appended.
    pub output_path: PathBuf,
    /// Encode 2D output as PNG instead of a texture asset. Ignored for 3D.
    pub encode_as_image: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            variant: NoiseVariant::Perlin2d,
            width: 256,
            height: 256,
            depth: 1,
            scale: 1.0,
            cell_density: 1.0,
            angle_offset: 0.0,
            seed: String::new(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            encode_as_image: false,
        }
    }
}

impl GenerationRequest {
    pub fn new(variant: NoiseVariant, width: u32, height: u32) -> Self {
        Self {
            variant,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>, encode_as_image: bool) -> Self {
        self.output_path = path.into();
        self.encode_as_image = encode_as_image;
        self
    }
}

/// Lifecycle of a single request.
///
/// `Idle → KernelResolved → Dispatched → ReadbackPending → {ImageWritten | AssetPersisted | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    KernelResolved,
    Dispatched,
    ReadbackPending,
    ImageWritten,
    AssetPersisted,
    Failed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::ImageWritten | RequestState::AssetPersisted | RequestState::Failed
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::KernelResolved => "kernel-resolved",
            RequestState::Dispatched => "dispatched",
            RequestState::ReadbackPending => "readback-pending",
            RequestState::ImageWritten => "image-written",
            RequestState::AssetPersisted => "asset-persisted",
            RequestState::Failed => "failed",
        }
    }
}
