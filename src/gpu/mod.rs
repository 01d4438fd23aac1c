//! Compute backend seam and its wgpu implementation.

mod backend;
mod context;
mod layout;

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec4};
use thiserror::Error;

use crate::pipeline::OutputDescriptor;

pub use backend::{WgpuBackend, WgpuKernel, WgpuResource};
pub use context::GpuContext;
pub use layout::{align_to, padded_row_bytes, unpad_rows};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(String),
    #[error("Kernel '{label}' failed to compile: {message}")]
    Kernel { label: String, message: String },
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
    #[error("Readback mapping failed: {0}")]
    Map(String),
}

/// Uniform block bound next to the output texture.
///
/// Layout matches the WGSL struct
/// `{ size: vec4<f32>, offset: vec4<f32>, scale: f32, cell_density: f32, angle_offset: f32, _pad: f32 }`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    /// (width, height, depth, 0)
    pub size: [f32; 4],
    pub offset: [f32; 4],
    pub scale: f32,
    pub cell_density: f32,
    pub angle_offset: f32,
    _pad: f32,
}

impl KernelParams {
    pub fn new(extent: UVec3, offset: Vec4, scale: f32, cell_density: f32, angle_offset: f32) -> Self {
        Self {
            size: [extent.x as f32, extent.y as f32, extent.z as f32, 0.0],
            offset: offset.to_array(),
            scale,
            cell_density,
            angle_offset,
            _pad: 0.0,
        }
    }
}

/// Completion handler for a readback. Receives the resource back together
/// with the tightly packed texel bytes.
pub type ReadbackCallback<R> = Box<dyn FnOnce(R, Result<Vec<u8>, BackendError>) + Send>;

/// Device operations the generation pipeline needs.
///
/// `request_readback` must invoke its callback exactly once, from a later
/// call to `poll` or from another thread, never before the written texels
/// are fully visible.
pub trait ComputeBackend: Send + Sync {
    type Kernel: Send + Sync;
    type Resource: Send + 'static;

    /// Allocates a storage-writable output resource.
    fn create_resource(&self, descriptor: &OutputDescriptor) -> Result<Self::Resource, BackendError>;

    /// Binds `resource` and `params` to `kernel` and enqueues the dispatch.
    fn dispatch(
        &self,
        kernel: &Self::Kernel,
        resource: &Self::Resource,
        params: &KernelParams,
        workgroups: UVec3,
    ) -> Result<(), BackendError>;

    /// Starts copying `resource` to host memory. Ownership moves into the
    /// pending transfer and is handed back through `on_complete`.
    fn request_readback(
        &self,
        resource: Self::Resource,
        descriptor: &OutputDescriptor,
        on_complete: ReadbackCallback<Self::Resource>,
    );

    /// Frees the device memory behind `resource`.
    fn release(&self, resource: Self::Resource);

    /// Drives pending transfers; with `wait` blocks until the device is idle.
    /// Returns the number of readbacks still in flight.
    fn poll(&self, wait: bool) -> Result<usize, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_params_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 48);
        let p = KernelParams::new(UVec3::new(64, 32, 1), Vec4::new(1.0, 2.0, 3.0, 4.0), 8.0, 4.0, 0.5);
        assert_eq!(p.size, [64.0, 32.0, 1.0, 0.0]);
        assert_eq!(p.offset, [1.0, 2.0, 3.0, 4.0]);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&p));
        assert_eq!(&floats[8..12], &[8.0, 4.0, 0.5, 0.0]);
    }
}
