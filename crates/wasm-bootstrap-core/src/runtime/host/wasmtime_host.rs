//! Wasmtime-backed host.

use std::any::Any;
use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use wasmtime::{
    Config, Engine, ExternType, Instance, Linker, Memory, MemoryType, Module, SharedMemory, Store,
};

use super::{InstantiateRequest, Instantiated, WasmHost};
use crate::runtime::error::{HostError, HostResult};
use crate::runtime::handle::ComputeModule;
use crate::runtime::worker_pool::WorkerPool;

/// How long the shared memory round trip may take.
const TRANSFER_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Thread name prefix for module workers.
const WORKER_THREAD_NAME: &str = "wasm-worker";

/// Host running modules on a single wasmtime [`Engine`].
///
/// The prefetched worker bootstrap and the main-script URL of an
/// [`InstantiateRequest`] only matter to a script host. This host accepts
/// and logs them, then ignores them. Its [`WorkerPool`] threads are plain
/// native workers and share no state with the module's memory.
#[derive(Clone)]
pub struct WasmtimeHost {
    engine: Engine,
    threads_enabled: bool,
    simd_enabled: bool,
}

impl WasmtimeHost {
    /// Create a host with the threads and SIMD proposals enabled, falling
    /// back to fewer proposals if the platform rejects them.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Instantiate`] if no engine configuration works.
    pub fn new() -> HostResult<Self> {
        let mut last_error = None;
        for (threads, simd) in [(true, true), (false, true), (false, false)] {
            match Self::with_features(threads, simd) {
                Ok(host) => return Ok(host),
                Err(e) => {
                    warn!(threads, simd, error = %e, "Engine configuration rejected, trying fallback");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| HostError::Instantiate {
            reason: "no engine configuration available".to_string(),
        }))
    }

    /// Create a host with an explicit proposal set.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Instantiate`] if wasmtime rejects the config.
    pub fn with_features(threads: bool, simd: bool) -> HostResult<Self> {
        let mut config = Config::new();
        config.wasm_threads(threads).wasm_simd(simd);
        if !simd {
            config.wasm_relaxed_simd(false);
        }
        let engine = Engine::new(&config).map_err(|e| HostError::Instantiate {
            reason: format!("engine creation failed: {e:#}"),
        })?;

        debug!(threads, simd, "Wasmtime engine created");
        Ok(Self {
            engine,
            threads_enabled: threads,
            simd_enabled: simd,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn one_page_shared_memory(&self) -> HostResult<SharedMemory> {
        SharedMemory::new(&self.engine, MemoryType::shared(1, 1)).map_err(|e| {
            HostError::ProbeFailed {
                probe: "shared_memory",
                reason: format!("{e:#}"),
            }
        })
    }
}

impl fmt::Debug for WasmtimeHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmtimeHost")
            .field("threads_enabled", &self.threads_enabled)
            .field("simd_enabled", &self.simd_enabled)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WasmHost for WasmtimeHost {
    fn name(&self) -> &'static str {
        "wasmtime"
    }

    fn validate(&self, bytes: &[u8]) -> HostResult<bool> {
        match Module::validate(&self.engine, bytes) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!(error = %e, "Module rejected by validator");
                Ok(false)
            }
        }
    }

    fn shared_memory_available(&self) -> bool {
        self.threads_enabled && self.one_page_shared_memory().is_ok()
    }

    fn probe_shared_memory_transfer(&self) -> HostResult<()> {
        let memory = self.one_page_shared_memory()?;
        let expected = memory.data_size();

        let (to_worker, worker_rx) = mpsc::channel::<SharedMemory>();
        let (to_main, main_rx) = mpsc::channel::<SharedMemory>();
        let echo = thread::Builder::new()
            .name("shared-memory-probe".to_string())
            .spawn(move || {
                if let Ok(memory) = worker_rx.recv() {
                    let _ = to_main.send(memory);
                }
            })
            .map_err(|e| HostError::ProbeFailed {
                probe: "shared_memory_transfer",
                reason: format!("cannot spawn probe thread: {e}"),
            })?;

        to_worker.send(memory).map_err(|_| HostError::ProbeFailed {
            probe: "shared_memory_transfer",
            reason: "probe thread hung up".to_string(),
        })?;
        let returned = main_rx
            .recv_timeout(TRANSFER_PROBE_TIMEOUT)
            .map_err(|e| HostError::ProbeFailed {
                probe: "shared_memory_transfer",
                reason: e.to_string(),
            })?;
        let _ = echo.join();

        if returned.data_size() == expected {
            Ok(())
        } else {
            Err(HostError::ProbeFailed {
                probe: "shared_memory_transfer",
                reason: format!("size changed from {expected} to {}", returned.data_size()),
            })
        }
    }

    async fn fetch_asset(&self, location: &str) -> HostResult<Vec<u8>> {
        let path = local_path(location)?;
        tokio::fs::read(path)
            .await
            .map_err(|source| HostError::AssetUnavailable {
                location: location.to_string(),
                source,
            })
    }

    async fn instantiate(&self, request: InstantiateRequest) -> HostResult<Instantiated> {
        let location = request.wasm_location();
        let bytes = self.fetch_asset(&location).await?;
        if let Some(worker) = &request.worker_bootstrap {
            debug!(
                worker = %worker.location,
                bytes = worker.bytes.len(),
                main_script = ?request.main_script_url,
                "Script-host inputs ignored by the native engine"
            );
        }

        let engine = self.engine.clone();
        let compile_location = location.clone();
        let module = tokio::task::spawn_blocking(move || {
            WasmtimeModule::instantiate(&engine, &bytes, &compile_location)
        })
        .await
        .map_err(|e| HostError::TaskAborted {
            reason: e.to_string(),
        })??;

        let worker_pool = match request.num_threads {
            Some(threads) => Some(WorkerPool::spawn(threads, WORKER_THREAD_NAME)?),
            None => None,
        };

        info!(
            variant = %request.variant,
            location = %location,
            exports = module.module.exports().len(),
            threads = request.num_threads.unwrap_or(1),
            "Wasmtime module instantiated"
        );

        Ok(Instantiated {
            module: Box::new(module),
            worker_pool,
        })
    }
}

/// Module instantiated in its own store.
pub struct WasmtimeModule {
    module: Module,
    store: Mutex<Store<()>>,
    instance: Instance,
}

impl WasmtimeModule {
    fn instantiate(engine: &Engine, bytes: &[u8], location: &str) -> HostResult<Self> {
        let module = Module::new(engine, bytes).map_err(|e| HostError::Compile {
            location: location.to_string(),
            reason: format!("{e:#}"),
        })?;

        let instantiate_err = |e: wasmtime::Error| HostError::Instantiate {
            reason: format!("{e:#}"),
        };

        let mut store = Store::new(engine, ());
        let mut linker: Linker<()> = Linker::new(engine);

        let memory_imports: Vec<(String, String, MemoryType)> = module
            .imports()
            .filter_map(|import| match import.ty() {
                ExternType::Memory(ty) => {
                    Some((import.module().to_string(), import.name().to_string(), ty))
                }
                _ => None,
            })
            .collect();

        for (module_name, name, ty) in memory_imports {
            if ty.is_shared() {
                let memory = SharedMemory::new(engine, ty).map_err(instantiate_err)?;
                linker
                    .define(&store, &module_name, &name, memory)
                    .map_err(instantiate_err)?;
            } else {
                let memory = Memory::new(&mut store, ty).map_err(instantiate_err)?;
                linker
                    .define(&store, &module_name, &name, memory)
                    .map_err(instantiate_err)?;
            }
        }

        // Function imports belong to the module's own glue; calling one traps.
        linker
            .define_unknown_imports_as_traps(&module)
            .map_err(instantiate_err)?;
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(instantiate_err)?;

        Ok(Self {
            module,
            store: Mutex::new(store),
            instance,
        })
    }

    /// Call a `() -> ()` export.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Instantiate`] if the export is missing, has the
    /// wrong signature, or traps.
    pub fn invoke(&self, export: &str) -> HostResult<()> {
        let mut store = self.store.lock();
        let func = self
            .instance
            .get_typed_func::<(), ()>(&mut *store, export)
            .map_err(|e| HostError::Instantiate {
                reason: format!("export {export}: {e:#}"),
            })?;
        func.call(&mut *store, ()).map_err(|e| HostError::Instantiate {
            reason: format!("call {export}: {e:#}"),
        })
    }
}

impl ComputeModule for WasmtimeModule {
    fn export_names(&self) -> Vec<String> {
        self.module
            .exports()
            .map(|export| export.name().to_string())
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for WasmtimeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmtimeModule")
            .field("exports", &self.export_names())
            .finish_non_exhaustive()
    }
}

/// Map a location to a local path. Plain paths and `file://` URLs only.
fn local_path(location: &str) -> HostResult<&str> {
    if let Some(path) = location.strip_prefix("file://") {
        return Ok(path);
    }
    if location.contains("://") {
        return Err(HostError::UnsupportedLocation {
            location: location.to_string(),
        });
    }
    Ok(location)
}
