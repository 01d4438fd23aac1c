//! Output shape and workgroup sizing.

use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::noise::{DimensionClass, NoiseVariant, VariantClasses};
use super::generator::GenerateError;

/// Local workgroup edge length the kernels are compiled for (8×8×8).
pub const WORKGROUP_SIZE: u32 = 8;

/// Pixel layout of every output resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Four 8-bit unsigned normalized channels.
    #[default]
    Rgba8Unorm,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8Unorm => 4,
        }
    }

    /// Numeric tag used in the texture asset header.
    pub fn tag(self) -> u8 {
        match self {
            PixelFormat::Rgba8Unorm => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(PixelFormat::Rgba8Unorm),
            _ => None,
        }
    }
}

/// Shape of the GPU resource and of the host buffer it is read back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub dimension: DimensionClass,
    pub width: u32,
    pub height: u32,
    /// Always 1 for 2D outputs.
    pub depth: u32,
    pub format: PixelFormat,
}

impl OutputDescriptor {
    pub fn new(dimension: DimensionClass, width: u32, height: u32, depth: u32) -> Self {
        let depth = match dimension {
            DimensionClass::D2 => 1,
            DimensionClass::D3 => depth,
        };
        Self {
            dimension,
            width,
            height,
            depth,
            format: PixelFormat::Rgba8Unorm,
        }
    }

    /// Host buffer size, or `None` when it does not fit in `usize`.
    pub fn checked_byte_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.depth.max(1) as usize)?
            .checked_mul(self.format.bytes_per_pixel() as usize)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth.max(1) as usize
    }

    /// Size in bytes of a tightly packed host copy.
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.format.bytes_per_pixel() as usize
    }

    /// Bytes in one unpadded row.
    pub fn row_bytes(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    pub fn extent(&self) -> UVec3 {
        UVec3::new(self.width, self.height, self.depth.max(1))
    }
}

/// Resolved output shape plus the grid of workgroups to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub descriptor: OutputDescriptor,
    pub workgroups: UVec3,
}

/// Number of workgroups covering `extent` texels.
pub fn workgroup_count(extent: u32) -> u32 {
    extent.div_ceil(WORKGROUP_SIZE)
}

/// Derives the output descriptor and workgroup grid for a variant.
///
/// Zero dimensions, and shapes whose byte size overflows, are rejected up
/// front instead of being handed to the allocator.
pub fn plan_dispatch(
    classes: &VariantClasses,
    variant: NoiseVariant,
    width: u32,
    height: u32,
    depth: u32,
) -> Result<DispatchPlan, GenerateError> {
    let dimension = classes
        .classify(variant)
        .ok_or(GenerateError::VariantUnsupported(variant))?;

    let descriptor = OutputDescriptor::new(dimension, width, height, depth);
    let empty = descriptor.width == 0 || descriptor.height == 0 || descriptor.depth == 0;
    if empty || descriptor.checked_byte_len().is_none() {
        return Err(GenerateError::InvalidDimensions {
            width,
            height,
            depth,
        });
    }

    let workgroups = UVec3::new(
        workgroup_count(descriptor.width),
        workgroup_count(descriptor.height),
        workgroup_count(descriptor.depth),
    );

    Ok(DispatchPlan {
        descriptor,
        workgroups,
    })
}
