//! Kernel parameter binding and dispatch.

use crate::gpu::{BackendError, ComputeBackend, KernelParams};
use crate::noise::ParameterRandomizer;
use super::plan::DispatchPlan;

/// Per-family scalar inputs forwarded to every kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseScalars {
    pub scale: f32,
    pub cell_density: f32,
    pub angle_offset: f32,
}

/// Allocates the output resource and enqueues the kernel over it.
///
/// Draws the four offset components from `randomizer`. The returned
/// resource is owned by the caller; on dispatch failure it is released
/// here.
pub fn execute<B: ComputeBackend>(
    backend: &B,
    kernel: &B::Kernel,
    plan: &DispatchPlan,
    randomizer: &mut ParameterRandomizer,
    scalars: NoiseScalars,
) -> Result<B::Resource, BackendError> {
    let descriptor = &plan.descriptor;
    let resource = backend.create_resource(descriptor)?;

    let params = KernelParams::new(
        descriptor.extent(),
        randomizer.offset_vector(),
        scalars.scale,
        scalars.cell_density,
        scalars.angle_offset,
    );
    log::debug!(
        "Dispatching {}x{}x{} output, offset {:?}",
        descriptor.width,
        descriptor.height,
        descriptor.depth,
        params.offset
    );

    if let Err(e) = backend.dispatch(kernel, &resource, &params, plan.workgroups) {
        backend.release(resource);
        return Err(e);
    }
    Ok(resource)
}
