//! In-memory backend and recording store for pipeline tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use glam::UVec3;
use parking_lot::Mutex;
use rand::RngCore;

use crate::export::{AssetStore, ExportError, FsAssetStore, Texture};
use crate::gpu::{BackendError, ComputeBackend, KernelParams, ReadbackCallback};
use crate::noise::Xorshift32;
use super::plan::OutputDescriptor;

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Kernel stand-in; the salt keeps variants apart.
pub struct FakeKernel(pub u8);

pub struct FakeResource {
    id: usize,
    texels: Mutex<Vec<u8>>,
}

type Pending = (FakeResource, ReadbackCallback<FakeResource>);

/// Fills resources deterministically from the bound parameters and
/// completes readbacks on a spawned thread during `poll`.
pub struct FakeBackend {
    next_id: AtomicUsize,
    log: EventLog,
    params: Mutex<Vec<KernelParams>>,
    workgroups: Mutex<Vec<UVec3>>,
    pending: Mutex<Vec<Pending>>,
    fail_dispatch: AtomicBool,
    fail_readback: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            log: Arc::new(Mutex::new(Vec::new())),
            params: Mutex::new(Vec::new()),
            workgroups: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            fail_dispatch: AtomicBool::new(false),
            fail_readback: AtomicBool::new(false),
        }
    }

    pub fn log(&self) -> EventLog {
        Arc::clone(&self.log)
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn allocations(&self) -> usize {
        self.count("alloc#")
    }

    pub fn releases(&self) -> usize {
        self.count("release#")
    }

    pub fn dispatched_params(&self) -> Vec<KernelParams> {
        self.params.lock().clone()
    }

    pub fn dispatched_workgroups(&self) -> Vec<UVec3> {
        self.workgroups.lock().clone()
    }

    pub fn fail_dispatches(&self, fail: bool) {
        self.fail_dispatch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_readbacks(&self, fail: bool) {
        self.fail_readback.store(fail, Ordering::SeqCst);
    }

    /// Drops queued readbacks without running their callbacks.
    pub fn discard_pending(&self) {
        let dropped: Vec<Pending> = self.pending.lock().drain(..).collect();
        drop(dropped);
    }

    /// Starts completing queued readbacks on worker threads and returns
    /// without waiting for them.
    pub fn complete_in_background(&self) -> Vec<JoinHandle<()>> {
        let ready: Vec<Pending> = self.pending.lock().drain(..).collect();
        let fail = self.fail_readback.load(Ordering::SeqCst);
        ready
            .into_iter()
            .map(|(resource, on_complete)| thread::spawn(move || complete(resource, on_complete, fail)))
            .collect()
    }

    fn count(&self, prefix: &str) -> usize {
        self.log.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn record(&self, event: String) {
        self.log.lock().push(event);
    }
}

impl ComputeBackend for FakeBackend {
    type Kernel = FakeKernel;
    type Resource = FakeResource;

    fn create_resource(&self, descriptor: &OutputDescriptor) -> Result<FakeResource, BackendError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.record(format!("alloc#{}", id));
        Ok(FakeResource {
            id,
            texels: Mutex::new(vec![0; descriptor.byte_len()]),
        })
    }

    fn dispatch(
        &self,
        kernel: &FakeKernel,
        resource: &FakeResource,
        params: &KernelParams,
        workgroups: UVec3,
    ) -> Result<(), BackendError> {
        if self.fail_dispatch.load(Ordering::SeqCst) {
            return Err(BackendError::Dispatch("injected".into()));
        }
        self.record(format!("dispatch#{}", resource.id));
        self.params.lock().push(*params);
        self.workgroups.lock().push(workgroups);

        let base = bytemuck::bytes_of(params)
            .iter()
            .fold(0x811C_9DC5u32 ^ kernel.0 as u32, |h, b| (h ^ *b as u32).wrapping_mul(0x0100_0193));
        Xorshift32::new(base).fill_bytes(&mut resource.texels.lock());
        Ok(())
    }

    fn request_readback(
        &self,
        resource: FakeResource,
        _descriptor: &OutputDescriptor,
        on_complete: ReadbackCallback<FakeResource>,
    ) {
        self.record(format!("readback#{}", resource.id));
        self.pending.lock().push((resource, on_complete));
    }

    fn release(&self, resource: FakeResource) {
        self.record(format!("release#{}", resource.id));
    }

    fn poll(&self, _wait: bool) -> Result<usize, BackendError> {
        let ready: Vec<Pending> = self.pending.lock().drain(..).collect();
        let fail = self.fail_readback.load(Ordering::SeqCst);
        for (resource, on_complete) in ready {
            let worker = thread::spawn(move || complete(resource, on_complete, fail));
            worker.join().expect("readback worker panicked");
        }
        Ok(self.pending.lock().len())
    }
}

fn complete(resource: FakeResource, on_complete: ReadbackCallback<FakeResource>, fail: bool) {
    let result = if fail {
        Err(BackendError::Map("injected".into()))
    } else {
        Ok(resource.texels.lock().clone())
    };
    on_complete(resource, result);
}

/// Filesystem store that also appends its calls to a shared event log.
pub struct RecordingStore {
    inner: FsAssetStore,
    log: EventLog,
    threads: Mutex<Vec<ThreadId>>,
    refreshes: AtomicUsize,
    fail: AtomicBool,
    panic: AtomicBool,
}

impl RecordingStore {
    pub fn new(inner: FsAssetStore, log: EventLog) -> Self {
        Self {
            inner,
            log,
            threads: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            panic: AtomicBool::new(false),
        }
    }

    pub fn panic_on_write(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn writer_threads(&self) -> Vec<ThreadId> {
        self.threads.lock().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn enter(&self, event: String) -> Result<(), ExportError> {
        self.threads.lock().push(thread::current().id());
        self.log.lock().push(event);
        if self.panic.load(Ordering::SeqCst) {
            panic!("store write panicked");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExportError::Io(std::io::Error::other("injected")));
        }
        Ok(())
    }
}

impl AssetStore for RecordingStore {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        self.enter(format!("write:{}", path.display()))?;
        self.inner.write_bytes(path, bytes)
    }

    fn create_asset(&self, texture: &Texture, path: &Path) -> Result<(), ExportError> {
        self.enter(format!("create:{}", path.display()))?;
        self.inner.create_asset(texture, path)
    }

    fn save_if_dirty(&self, path: &Path) -> Result<bool, ExportError> {
        self.enter(format!("save:{}", path.display()))?;
        self.inner.save_if_dirty(path)
    }

    fn refresh(&self) -> Result<(), ExportError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.enter("refresh".to_string())?;
        self.inner.refresh()
    }
}
