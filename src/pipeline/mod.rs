//! Pipeline module for turning a generation request into a persisted texture.
//!
//! A request is planned, dispatched on the compute backend, read back
//! asynchronously and finally handed to the asset writer.

mod executor;
mod generator;
mod plan;
mod readback;
mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use executor::{execute, NoiseScalars};
pub use generator::{GenerateError, NoiseGenerator, OutputSlot, PendingGeneration};
pub use plan::{
    plan_dispatch, workgroup_count, DispatchPlan, OutputDescriptor, PixelFormat, WORKGROUP_SIZE,
};
pub use readback::{HandlerResult, HostBuffer, PendingReadback, ReadbackManager};
pub use request::{GenerationRequest, RequestState, DEFAULT_OUTPUT_PATH};
