//! wgpu implementation of [`ComputeBackend`].

use std::borrow::Cow;
use std::sync::Arc;

use glam::UVec3;
use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::noise::DimensionClass;
use crate::pipeline::OutputDescriptor;
use super::context::GpuContext;
use super::layout::{padded_row_bytes, unpad_rows};
use super::{BackendError, ComputeBackend, KernelParams, ReadbackCallback};

/// A compiled noise kernel.
///
/// The bind group layout is reflected from the shader, so the same type
/// serves `texture_storage_2d` and `texture_storage_3d` kernels.
pub struct WgpuKernel {
    label: String,
    pipeline: wgpu::ComputePipeline,
}

impl WgpuKernel {
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Output texture of one generation request.
pub struct WgpuResource {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

type MapStatus = Arc<Mutex<Option<Result<(), BackendError>>>>;

struct InFlight {
    resource: WgpuResource,
    staging: wgpu::Buffer,
    row_bytes: u32,
    padded_bpr: u32,
    rows: u32,
    status: MapStatus,
    on_complete: ReadbackCallback<WgpuResource>,
}

impl InFlight {
    fn is_ready(&self) -> bool {
        self.status.lock().is_some()
    }

    fn complete(self) {
        let InFlight {
            resource,
            staging,
            row_bytes,
            padded_bpr,
            rows,
            status,
            on_complete,
        } = self;

        let status = status.lock().take();
        let result = match status {
            Some(Ok(())) => {
                let data = staging.slice(..).get_mapped_range();
                let bytes = unpad_rows(&data, row_bytes, padded_bpr, rows);
                drop(data);
                staging.unmap();
                Ok(bytes)
            }
            Some(Err(e)) => Err(e),
            None => Err(BackendError::Map("completed before mapping finished".to_string())),
        };
        drop(staging);
        on_complete(resource, result);
    }
}

/// Runs noise kernels on a wgpu device.
///
/// Expects a single submitting thread: validation error scopes are
/// device-wide, so concurrent `generate` calls could pop each other's errors.
pub struct WgpuBackend {
    ctx: GpuContext,
    in_flight: Mutex<Vec<InFlight>>,
}

impl WgpuBackend {
    pub fn new(ctx: GpuContext) -> Self {
        Self {
            ctx,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Runs `f` inside a validation error scope.
    fn validated<T>(&self, f: impl FnOnce() -> T) -> Result<T, String> {
        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        match pollster::block_on(self.ctx.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    /// Compiles a WGSL kernel following the noise kernel ABI:
    /// `@binding(0)` output storage texture, `@binding(1)` [`KernelParams`] uniform.
    pub fn compile_kernel(&self, label: &str, source: &str, entry_point: &str) -> Result<WgpuKernel, BackendError> {
        let device = &self.ctx.device;
        let pipeline = self
            .validated(|| {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
                });
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(label),
                    layout: None,
                    module: &module,
                    entry_point: Some(entry_point),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
            })
            .map_err(|message| BackendError::Kernel {
                label: label.to_string(),
                message,
            })?;

        log::debug!("Compiled kernel '{}' (entry point '{}')", label, entry_point);
        Ok(WgpuKernel {
            label: label.to_string(),
            pipeline,
        })
    }
}

fn texture_dimension(dimension: DimensionClass) -> (wgpu::TextureDimension, wgpu::TextureViewDimension) {
    match dimension {
        DimensionClass::D2 => (wgpu::TextureDimension::D2, wgpu::TextureViewDimension::D2),
        DimensionClass::D3 => (wgpu::TextureDimension::D3, wgpu::TextureViewDimension::D3),
    }
}

fn texture_format(descriptor: &OutputDescriptor) -> wgpu::TextureFormat {
    match descriptor.format {
        crate::pipeline::PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
    }
}

fn extent(descriptor: &OutputDescriptor) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: descriptor.width,
        height: descriptor.height,
        depth_or_array_layers: descriptor.depth.max(1),
    }
}

impl ComputeBackend for WgpuBackend {
    type Kernel = WgpuKernel;
    type Resource = WgpuResource;

    fn create_resource(&self, descriptor: &OutputDescriptor) -> Result<WgpuResource, BackendError> {
        let (dimension, view_dimension) = texture_dimension(descriptor.dimension);
        let format = texture_format(descriptor);
        let device = &self.ctx.device;

        let (texture, view) = self
            .validated(|| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("noisebake-output"),
                    size: extent(descriptor),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension,
                    format,
                    usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("noisebake-output-view"),
                    format: Some(format),
                    dimension: Some(view_dimension),
                    ..Default::default()
                });
                (texture, view)
            })
            .map_err(BackendError::Dispatch)?;

        Ok(WgpuResource { texture, view })
    }

    fn dispatch(
        &self,
        kernel: &WgpuKernel,
        resource: &WgpuResource,
        params: &KernelParams,
        workgroups: UVec3,
    ) -> Result<(), BackendError> {
        let device = &self.ctx.device;
        let encoder = self
            .validated(|| {
                let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("noisebake-params"),
                    contents: bytemuck::bytes_of(params),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let layout = kernel.pipeline.get_bind_group_layout(0);
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("noisebake-bind-group"),
                    layout: &layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&resource.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: params_buf.as_entire_binding(),
                        },
                    ],
                });

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("noisebake-dispatch-encoder"),
                });
                {
                    let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some(kernel.label()),
                        timestamp_writes: None,
                    });
                    cpass.set_pipeline(&kernel.pipeline);
                    cpass.set_bind_group(0, &bind_group, &[]);
                    cpass.dispatch_workgroups(workgroups.x, workgroups.y, workgroups.z);
                }
                encoder.finish()
            })
            .map_err(BackendError::Dispatch)?;

        self.ctx.queue.submit(Some(encoder));
        log::trace!(
            "Dispatched '{}' over {}x{}x{} workgroups",
            kernel.label(),
            workgroups.x,
            workgroups.y,
            workgroups.z
        );
        Ok(())
    }

    fn request_readback(
        &self,
        resource: WgpuResource,
        descriptor: &OutputDescriptor,
        on_complete: ReadbackCallback<WgpuResource>,
    ) {
        let row_bytes = descriptor.row_bytes();
        let padded_bpr = padded_row_bytes(row_bytes);
        let rows = descriptor.height * descriptor.depth.max(1);
        let device = &self.ctx.device;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("noisebake-readback-buffer"),
            size: padded_bpr as u64 * rows as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let copy = self.validated(|| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("noisebake-readback-encoder"),
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &resource.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &staging,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_bpr),
                        rows_per_image: Some(descriptor.height),
                    },
                },
                extent(descriptor),
            );
            encoder.finish()
        });

        let status: MapStatus = Arc::new(Mutex::new(None));
        match copy {
            Ok(commands) => {
                self.ctx.queue.submit(Some(commands));
                let signal = Arc::clone(&status);
                staging.slice(..).map_async(wgpu::MapMode::Read, move |r| {
                    *signal.lock() = Some(r.map_err(|e| BackendError::Map(e.to_string())));
                });
            }
            // Reported from the next poll so the callback never runs re-entrantly.
            Err(message) => *status.lock() = Some(Err(BackendError::Dispatch(message))),
        }

        self.in_flight.lock().push(InFlight {
            resource,
            staging,
            row_bytes,
            padded_bpr,
            rows,
            status,
            on_complete,
        });
    }

    fn release(&self, resource: WgpuResource) {
        resource.texture.destroy();
    }

    fn poll(&self, wait: bool) -> Result<usize, BackendError> {
        let maintain = if wait { wgpu::Maintain::Wait } else { wgpu::Maintain::Poll };
        let _ = self.ctx.device.poll(maintain);

        let ready: Vec<InFlight> = {
            let mut in_flight = self.in_flight.lock();
            let (ready, pending): (Vec<_>, Vec<_>) = in_flight.drain(..).partition(InFlight::is_ready);
            *in_flight = pending;
            ready
        };

        for transfer in ready {
            transfer.complete();
        }

        Ok(self.in_flight.lock().len())
    }
}
