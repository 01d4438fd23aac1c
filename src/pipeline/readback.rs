//! Asynchronous readback of generated textures.
//!
//! A readback owns the GPU resource from the moment it is requested. When
//! the backend reports completion, the texels are wrapped in a
//! [`HostBuffer`] and handed to the completion handler. The host buffer is
//! then dropped, and the resource released last.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::export::ExportError;
use crate::gpu::ComputeBackend;
use super::plan::OutputDescriptor;
use super::request::RequestState;

/// Host copy of a generated texture, tightly packed RGBA8.
#[derive(Debug)]
pub struct HostBuffer {
    bytes: Vec<u8>,
    descriptor: OutputDescriptor,
}

impl HostBuffer {
    pub fn new(bytes: Vec<u8>, descriptor: OutputDescriptor) -> Result<Self, ExportError> {
        if bytes.len() != descriptor.byte_len() {
            return Err(ExportError::SizeMismatch {
                expected: descriptor.byte_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, descriptor })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn descriptor(&self) -> &OutputDescriptor {
        &self.descriptor
    }

    /// Frees the buffer. Consuming `self` makes a second disposal impossible.
    pub fn dispose(self) {
        log::trace!("Disposed host buffer of {} bytes", self.bytes.len());
    }
}

/// Outcome reported by a completion handler.
pub type HandlerResult = Result<RequestState, ExportError>;

/// Handle to a readback that has been requested but may not have finished.
#[derive(Debug, Clone)]
pub struct PendingReadback {
    state: Arc<Mutex<RequestState>>,
}

impl PendingReadback {
    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Releases the resource when dropped, including during unwinding.
struct ReleaseGuard<B: ComputeBackend + 'static> {
    backend: Arc<B>,
    resource: Option<B::Resource>,
}

impl<B: ComputeBackend + 'static> Drop for ReleaseGuard<B> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.backend.release(resource);
        }
    }
}

/// Publishes the terminal state and retires the in-flight count when
/// dropped. Stays `Failed` unless the completion reaches its end.
struct Completion {
    state: Arc<Mutex<RequestState>>,
    in_flight: Arc<AtomicUsize>,
    terminal: RequestState,
}

impl Drop for Completion {
    fn drop(&mut self) {
        *self.state.lock() = self.terminal;
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs a completion handler, turning a panic into an error so the
/// backend can keep draining other transfers.
fn run_handler<F>(handler: F, host: &HostBuffer) -> HandlerResult
where
    F: FnOnce(&HostBuffer) -> HandlerResult,
{
    panic::catch_unwind(AssertUnwindSafe(|| handler(host))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ExportError::HandlerPanicked(message))
    })
}

/// Issues readbacks and runs their completion handlers exactly once.
pub struct ReadbackManager<B: ComputeBackend + 'static> {
    backend: Arc<B>,
    in_flight: Arc<AtomicUsize>,
}

impl<B: ComputeBackend + 'static> ReadbackManager<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of readbacks whose handler has not run yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Requests a readback of `resource` and returns immediately.
    ///
    /// `handler` sees the fully written host buffer and returns the terminal
    /// state. It is skipped when the transfer itself fails. Either way the
    /// host buffer is disposed before the resource is released.
    pub fn request<F>(&self, resource: B::Resource, descriptor: OutputDescriptor, handler: F) -> PendingReadback
    where
        F: FnOnce(&HostBuffer) -> HandlerResult + Send + 'static,
    {
        self.request_with_state(
            resource,
            descriptor,
            Arc::new(Mutex::new(RequestState::ReadbackPending)),
            handler,
        )
    }

    /// Like [`ReadbackManager::request`], publishing into an existing state cell.
    pub fn request_with_state<F>(
        &self,
        resource: B::Resource,
        descriptor: OutputDescriptor,
        state: Arc<Mutex<RequestState>>,
        handler: F,
    ) -> PendingReadback
    where
        F: FnOnce(&HostBuffer) -> HandlerResult + Send + 'static,
    {
        *state.lock() = RequestState::ReadbackPending;
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let backend = Arc::clone(&self.backend);
        let completion = Completion {
            state: Arc::clone(&state),
            in_flight: Arc::clone(&self.in_flight),
            terminal: RequestState::Failed,
        };

        self.backend.request_readback(
            resource,
            &descriptor,
            Box::new(move |resource, result| {
                let mut completion = completion;
                let guard = ReleaseGuard {
                    backend,
                    resource: Some(resource),
                };

                let outcome = match result.map_err(ExportError::from) {
                    Ok(bytes) => match HostBuffer::new(bytes, descriptor) {
                        Ok(host) => {
                            let outcome = run_handler(handler, &host);
                            host.dispose();
                            outcome
                        }
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                };
                drop(guard);

                completion.terminal = match outcome {
                    Ok(state) => state,
                    Err(e) => {
                        log::error!("Readback failed: {}", e);
                        RequestState::Failed
                    }
                };
            }),
        );

        PendingReadback { state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::KernelParams;
    use crate::noise::DimensionClass;
    use crate::pipeline::testing::{FakeBackend, FakeKernel};
    use glam::{UVec3, Vec4};

    fn dispatched(backend: &FakeBackend, descriptor: &OutputDescriptor) -> <FakeBackend as ComputeBackend>::Resource {
        let resource = backend.create_resource(descriptor).unwrap();
        let params = KernelParams::new(descriptor.extent(), Vec4::ONE, 1.0, 1.0, 0.0);
        backend
            .dispatch(&FakeKernel(1), &resource, &params, UVec3::ONE)
            .unwrap();
        resource
    }

    #[test]
    fn test_host_buffer_rejects_wrong_length() {
        let desc = OutputDescriptor::new(DimensionClass::D2, 4, 4, 1);
        let err = HostBuffer::new(vec![0; 10], desc).unwrap_err();
        assert!(matches!(err, ExportError::SizeMismatch { expected: 64, actual: 10 }));
    }

    #[test]
    fn test_handler_runs_once_with_full_buffer() {
        let backend = Arc::new(FakeBackend::new());
        let manager = ReadbackManager::new(Arc::clone(&backend));
        let desc = OutputDescriptor::new(DimensionClass::D3, 4, 2, 3);
        let resource = dispatched(&backend, &desc);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pending = manager.request(resource, desc, move |host| {
            sink.lock().push(host.len());
            Ok(RequestState::AssetPersisted)
        });

        assert_eq!(pending.state(), RequestState::ReadbackPending);
        assert!(!pending.is_complete());
        assert_eq!(manager.in_flight(), 1);

        backend.poll(true).unwrap();
        backend.poll(true).unwrap();

        assert_eq!(*seen.lock(), vec![4 * 2 * 3 * 4]);
        assert_eq!(pending.state(), RequestState::AssetPersisted);
        assert_eq!(manager.in_flight(), 0);
        assert_eq!(backend.releases(), 1);
    }

    #[test]
    fn test_handler_error_marks_failed_and_releases() {
        let backend = Arc::new(FakeBackend::new());
        let manager = ReadbackManager::new(Arc::clone(&backend));
        let desc = OutputDescriptor::new(DimensionClass::D2, 2, 2, 1);
        let resource = dispatched(&backend, &desc);

        let pending = manager.request(resource, desc, |_| Err(ExportError::NotReadable));
        backend.poll(true).unwrap();

        assert_eq!(pending.state(), RequestState::Failed);
        assert_eq!(backend.releases(), 1);
        assert_eq!(manager.in_flight(), 0);
    }

    #[test]
    fn test_panicking_handler_still_retires_request() {
        let backend = Arc::new(FakeBackend::new());
        let manager = ReadbackManager::new(Arc::clone(&backend));
        let desc = OutputDescriptor::new(DimensionClass::D2, 2, 2, 1);
        let first = dispatched(&backend, &desc);
        let second = dispatched(&backend, &desc);

        let broken = manager.request(first, desc, |_| panic!("writer blew up"));
        let healthy = manager.request(second, desc, |_| Ok(RequestState::AssetPersisted));
        assert_eq!(manager.in_flight(), 2);

        backend.poll(true).unwrap();

        assert_eq!(broken.state(), RequestState::Failed);
        assert_eq!(healthy.state(), RequestState::AssetPersisted);
        assert_eq!(manager.in_flight(), 0);
        assert_eq!(backend.releases(), 2);
    }

    #[test]
    fn test_dropped_callback_counts_as_failed() {
        let backend = Arc::new(FakeBackend::new());
        let manager = ReadbackManager::new(Arc::clone(&backend));
        let desc = OutputDescriptor::new(DimensionClass::D2, 2, 2, 1);
        let resource = dispatched(&backend, &desc);

        let pending = manager.request(resource, desc, |_| Ok(RequestState::AssetPersisted));
        backend.discard_pending();

        assert_eq!(pending.state(), RequestState::Failed);
        assert_eq!(manager.in_flight(), 0);
    }
}
