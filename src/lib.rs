//! GPU procedural noise baker.
//!
//! This crate dispatches Perlin, Simplex and Voronoi compute kernels into
//! 2D textures or 3D volumes, reads the result back asynchronously and
//! persists it as a PNG or a texture asset.

pub mod config;
pub mod export;
pub mod gpu;
pub mod kernel;
pub mod noise;
pub mod pipeline;

pub use config::{ConfigError, GeneratorConfig, GeneratorEntry};
pub use export::{AssetStore, AssetWriter, ExportError, FsAssetStore, Texture};
pub use gpu::{BackendError, ComputeBackend, GpuContext, WgpuBackend};
pub use kernel::{KernelBinding, KernelRegistry};
pub use noise::{DimensionClass, NoiseVariant, ParameterRandomizer, VariantClasses};
pub use pipeline::{GenerateError, GenerationRequest, NoiseGenerator, PendingGeneration, RequestState};
