//! Scripted host and fixtures for runtime tests.

use std::any::Any;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::runtime::config::BuildFlags;
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::handle::ComputeModule;
use crate::runtime::host::{InstantiateRequest, Instantiated, WasmHost};
use crate::runtime::loader::LoadReport;
use crate::runtime::probe::CapabilityFlags;
use crate::runtime::variant::VariantName;
use crate::runtime::worker_pool::WorkerPool;

/// Minimal valid module: imports `env.f`, exports an empty `main`.
pub const TRIVIAL_MODULE: &[u8] = &[
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // header
    0x01, 0x04, 0x01, 0x60, 0x00, 0x00, // type: () -> ()
    0x02, 0x09, 0x01, 0x03, 0x65, 0x6e, 0x76, 0x01, 0x66, 0x00, 0x00, // import env.f
    0x03, 0x02, 0x01, 0x00, // func 1: type 0
    0x07, 0x08, 0x01, 0x04, 0x6d, 0x61, 0x69, 0x6e, 0x00, 0x01, // export "main"
    0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b, // body: end
];

/// Module importing a one-page shared memory `env.memory`.
pub const SHARED_MEMORY_MODULE: &[u8] = &[
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, // header
    0x02, 0x10, 0x01, 0x03, 0x65, 0x6e, 0x76, 0x06, 0x6d, 0x65, 0x6d, 0x6f, 0x72, 0x79, 0x02,
    0x03, 0x01, 0x01, // import env.memory (shared 1 1)
];

/// Build flags with only threads built.
pub fn no_optional_builds() -> BuildFlags {
    BuildFlags {
        disable_training: true,
        disable_jsep: true,
        disable_wasm_thread: false,
    }
}

/// A report for handles built outside a load.
pub fn sample_report() -> LoadReport {
    LoadReport {
        variant: VariantName::SIMD,
        capabilities: CapabilityFlags {
            threads_supported: false,
            simd_supported: true,
        },
        threaded: false,
        num_threads: None,
        wasm_location: "/test/ort-wasm-simd.wasm".to_string(),
        worker_location: None,
        main_script_url: None,
        elapsed_ms: 0,
    }
}

/// Module stand-in that counts its drops.
#[derive(Debug, Default)]
pub struct NullModule {
    dropped: Option<Arc<AtomicUsize>>,
}

impl NullModule {
    pub fn counted(dropped: Arc<AtomicUsize>) -> Self {
        Self {
            dropped: Some(dropped),
        }
    }
}

impl ComputeModule for NullModule {
    fn export_names(&self) -> Vec<String> {
        vec!["main".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for NullModule {
    fn drop(&mut self) {
        if let Some(dropped) = &self.dropped {
            dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ValidateBehavior {
    Accept,
    Reject,
    Fail,
    Panic,
}

#[derive(Debug, Clone, Copy)]
pub enum InstantiateBehavior {
    Succeed { delay: Duration },
    Fail,
    Panic,
    Never,
}

/// Host whose every primitive is scripted and counted.
pub struct ScriptedHost {
    shared_memory: bool,
    transfer_ok: bool,
    transfer_delay: Duration,
    validate: ValidateBehavior,
    instantiate: InstantiateBehavior,
    fetch_fails: bool,
    validate_calls: AtomicUsize,
    transfer_calls: AtomicUsize,
    instantiate_calls: AtomicUsize,
    instantiate_finished: AtomicBool,
    fetched: Mutex<Vec<String>>,
    requests: Mutex<Vec<InstantiateRequest>>,
    modules_dropped: Arc<AtomicUsize>,
}

impl ScriptedHost {
    /// Host supporting threads and SIMD, instantiating immediately.
    pub fn capable() -> Self {
        Self {
            shared_memory: true,
            transfer_ok: true,
            transfer_delay: Duration::ZERO,
            validate: ValidateBehavior::Accept,
            instantiate: InstantiateBehavior::Succeed {
                delay: Duration::ZERO,
            },
            fetch_fails: false,
            validate_calls: AtomicUsize::new(0),
            transfer_calls: AtomicUsize::new(0),
            instantiate_calls: AtomicUsize::new(0),
            instantiate_finished: AtomicBool::new(false),
            fetched: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            modules_dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_shared_memory(mut self, available: bool) -> Self {
        self.shared_memory = available;
        self
    }

    pub fn with_transfer(mut self, ok: bool) -> Self {
        self.transfer_ok = ok;
        self
    }

    /// Make the transfer probe block its thread for `delay`.
    pub fn with_transfer_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = delay;
        self
    }

    pub fn with_validate(mut self, behavior: ValidateBehavior) -> Self {
        self.validate = behavior;
        self
    }

    pub fn with_instantiate(mut self, behavior: InstantiateBehavior) -> Self {
        self.instantiate = behavior;
        self
    }

    pub fn with_failing_fetch(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn transfer_calls(&self) -> usize {
        self.transfer_calls.load(Ordering::SeqCst)
    }

    pub fn instantiate_calls(&self) -> usize {
        self.instantiate_calls.load(Ordering::SeqCst)
    }

    pub fn instantiate_finished(&self) -> bool {
        self.instantiate_finished.load(Ordering::SeqCst)
    }

    pub fn fetched_locations(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    pub fn last_request(&self) -> Option<InstantiateRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn modules_dropped(&self) -> usize {
        self.modules_dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WasmHost for ScriptedHost {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn validate(&self, _bytes: &[u8]) -> HostResult<bool> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        match self.validate {
            ValidateBehavior::Accept => Ok(true),
            ValidateBehavior::Reject => Ok(false),
            ValidateBehavior::Fail => Err(HostError::Validation {
                reason: "scripted validation failure".to_string(),
            }),
            ValidateBehavior::Panic => panic!("scripted validation panic"),
        }
    }

    fn shared_memory_available(&self) -> bool {
        self.shared_memory
    }

    fn cross_origin_isolated(&self) -> Option<bool> {
        Some(self.shared_memory)
    }

    fn probe_shared_memory_transfer(&self) -> HostResult<()> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        if !self.transfer_delay.is_zero() {
            std::thread::sleep(self.transfer_delay);
        }
        if self.transfer_ok {
            Ok(())
        } else {
            Err(HostError::ProbeFailed {
                probe: "shared_memory_transfer",
                reason: "scripted transfer failure".to_string(),
            })
        }
    }

    async fn fetch_asset(&self, location: &str) -> HostResult<Vec<u8>> {
        self.fetched.lock().push(location.to_string());
        if self.fetch_fails {
            return Err(HostError::AssetUnavailable {
                location: location.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "scripted missing asset"),
            });
        }
        Ok(b"// worker bootstrap".to_vec())
    }

    async fn instantiate(&self, request: InstantiateRequest) -> HostResult<Instantiated> {
        self.instantiate_calls.fetch_add(1, Ordering::SeqCst);
        let num_threads = request.num_threads;
        self.requests.lock().push(request);

        match self.instantiate {
            InstantiateBehavior::Succeed { delay } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let worker_pool = match num_threads {
                    Some(n) => Some(WorkerPool::spawn(n, "scripted-worker")?),
                    None => None,
                };
                self.instantiate_finished.store(true, Ordering::SeqCst);
                Ok(Instantiated {
                    module: Box::new(NullModule::counted(Arc::clone(&self.modules_dropped))),
                    worker_pool,
                })
            }
            InstantiateBehavior::Fail => Err(HostError::Instantiate {
                reason: "scripted rejection".to_string(),
            }),
            InstantiateBehavior::Panic => panic!("scripted instantiate panic"),
            InstantiateBehavior::Never => std::future::pending().await,
        }
    }
}
