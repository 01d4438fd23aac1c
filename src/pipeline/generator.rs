//! Top-level noise generation entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::export::{AssetStore, AssetWriter, Texture, WriteOutcome};
use crate::gpu::{BackendError, ComputeBackend};
use crate::kernel::KernelRegistry;
use crate::noise::{NoiseVariant, ParameterRandomizer, VariantClasses};
use super::executor::{execute, NoiseScalars};
use super::plan::plan_dispatch;
use super::readback::{PendingReadback, ReadbackManager};
use super::request::{GenerationRequest, RequestState};

/// Errors that abort a generation request before readback.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Entry of type {0} did not have an associated kernel")]
    KernelNotBound(NoiseVariant),
    #[error("Could not find a generator for type {0}")]
    VariantUnsupported(NoiseVariant),
    #[error("Invalid output dimensions {width}x{height}x{depth}")]
    InvalidDimensions { width: u32, height: u32, depth: u32 },
    #[error("GPU backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Slot holding the most recently persisted texture.
pub type OutputSlot = Arc<Mutex<Option<Arc<Texture>>>>;

/// A request whose readback has been issued.
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    variant: NoiseVariant,
    output_path: PathBuf,
    readback: PendingReadback,
}

impl PendingGeneration {
    pub fn variant(&self) -> NoiseVariant {
        self.variant
    }

    /// Output path without extension, as requested.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn state(&self) -> RequestState {
        self.readback.state()
    }

    pub fn is_complete(&self) -> bool {
        self.readback.is_complete()
    }
}

/// Bakes noise textures: resolves a kernel, dispatches it and persists the
/// readback once the device delivers it.
pub struct NoiseGenerator<B: ComputeBackend + 'static, S: AssetStore + 'static> {
    backend: Arc<B>,
    registry: KernelRegistry<B::Kernel>,
    classes: VariantClasses,
    readback: ReadbackManager<B>,
    writer: Arc<AssetWriter<S>>,
    output: OutputSlot,
}

impl<B: ComputeBackend + 'static, S: AssetStore + 'static> NoiseGenerator<B, S> {
    pub fn new(backend: Arc<B>, registry: KernelRegistry<B::Kernel>, store: Arc<S>) -> Self {
        Self::with_writer(backend, registry, AssetWriter::new(store))
    }

    pub fn with_writer(backend: Arc<B>, registry: KernelRegistry<B::Kernel>, writer: AssetWriter<S>) -> Self {
        Self {
            readback: ReadbackManager::new(Arc::clone(&backend)),
            backend,
            registry,
            classes: VariantClasses::default(),
            writer: Arc::new(writer),
            output: Arc::new(Mutex::new(None)),
        }
    }

    /// Replaces the 2D/3D classification table.
    pub fn with_classes(mut self, classes: VariantClasses) -> Self {
        self.classes = classes;
        self
    }

    pub fn registry(&self) -> &KernelRegistry<B::Kernel> {
        &self.registry
    }

    pub fn classes(&self) -> &VariantClasses {
        &self.classes
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Latest persisted texture. `None` while a readback is pending and
    /// after an image-only bake.
    pub fn output_texture(&self) -> Option<Arc<Texture>> {
        self.output.lock().clone()
    }

    /// Readbacks whose completion has not run yet.
    pub fn in_flight(&self) -> usize {
        self.readback.in_flight()
    }

    /// Starts a bake and returns without waiting for the GPU.
    ///
    /// Failures before dispatch are logged and returned; no device resources
    /// are held afterwards.
    pub fn generate(&self, request: &GenerationRequest) -> Result<PendingGeneration, GenerateError> {
        self.try_generate(request).inspect_err(|e| log::error!("{}", e))
    }

    fn try_generate(&self, request: &GenerationRequest) -> Result<PendingGeneration, GenerateError> {
        let variant = request.variant;
        let state = Arc::new(Mutex::new(RequestState::Idle));

        let binding = self
            .registry
            .find(variant)
            .ok_or(GenerateError::VariantUnsupported(variant))?;
        let kernel = binding
            .kernel
            .as_ref()
            .ok_or(GenerateError::KernelNotBound(variant))?;
        transition(&state, RequestState::KernelResolved);

        let plan = plan_dispatch(&self.classes, variant, request.width, request.height, request.depth)?;
        let mut randomizer = ParameterRandomizer::new(&request.seed);
        let scalars = NoiseScalars {
            scale: request.scale,
            cell_density: request.cell_density,
            angle_offset: request.angle_offset,
        };
        let resource = execute(self.backend.as_ref(), kernel, &plan, &mut randomizer, scalars)?;
        transition(&state, RequestState::Dispatched);

        *self.output.lock() = None;

        let writer = Arc::clone(&self.writer);
        let output = Arc::clone(&self.output);
        let descriptor = plan.descriptor;
        let output_path = request.output_path.clone();
        let encode_as_image = request.encode_as_image;

        let readback = self.readback.request_with_state(resource, descriptor, Arc::clone(&state), move |host| {
            match writer.write(host, &descriptor, &output_path, encode_as_image)? {
                WriteOutcome::ImageWritten { .. } => {
                    *output.lock() = None;
                    Ok(RequestState::ImageWritten)
                }
                WriteOutcome::AssetPersisted { texture, .. } => {
                    *output.lock() = Some(Arc::new(texture));
                    Ok(RequestState::AssetPersisted)
                }
            }
        });
        log::debug!("{} readback requested for {}", variant, request.output_path.display());

        Ok(PendingGeneration {
            variant,
            output_path: request.output_path.clone(),
            readback,
        })
    }

    /// Runs any completions the device has ready, without blocking.
    /// Returns the number of readbacks still outstanding.
    pub fn poll(&self) -> Result<usize, GenerateError> {
        self.backend.poll(false)?;
        Ok(self.in_flight())
    }

    /// Blocks until every issued readback has completed.
    pub fn wait_idle(&self) -> Result<(), GenerateError> {
        while self.in_flight() > 0 {
            self.backend.poll(true)?;
        }
        Ok(())
    }
}

fn transition(state: &Mutex<RequestState>, next: RequestState) {
    let mut current = state.lock();
    log::trace!("Request {} -> {}", current.name(), next.name());
    *current = next;
}
