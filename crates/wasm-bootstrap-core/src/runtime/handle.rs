//! Opaque handle to a loaded compute module.
//!
//! # Ownership
//!
//! The lifecycle machine owns the single Ready handle. Callers receive an
//! `Arc<ModuleHandle>` from `get_instance()`, but that clone does not keep the
//! module usable: [`ModuleHandle::release`] flips a revocation flag that
//! every clone observes, after which [`ModuleHandle::module`] refuses access
//! and [`ModuleHandle::is_live`] reports `false`.
//!
//! The worker pool of a threaded load belongs to the handle and is terminated
//! on release, or on drop if release never ran.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use super::error::{RuntimeError, RuntimeResult};
use super::loader::LoadReport;
use super::probe::CapabilityFlags;
use super::variant::VariantName;
use super::worker_pool::WorkerPool;

/// The compute module produced by a host. Treated as a black box.
pub trait ComputeModule: Send + Sync + fmt::Debug {
    /// Names of the functions the module exports.
    fn export_names(&self) -> Vec<String>;

    /// Downcast hook for host-specific access.
    fn as_any(&self) -> &dyn Any;
}

/// Live reference to the instantiated module variant.
pub struct ModuleHandle {
    instance_id: Uuid,
    report: LoadReport,
    module: Box<dyn ComputeModule>,
    worker_pool: Mutex<Option<WorkerPool>>,
    revoked: AtomicBool,
    loaded_at: DateTime<Utc>,
}

impl ModuleHandle {
    /// Wrap a freshly instantiated module.
    #[must_use]
    pub fn new(
        report: LoadReport,
        module: Box<dyn ComputeModule>,
        worker_pool: Option<WorkerPool>,
    ) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            report,
            module,
            worker_pool: Mutex::new(worker_pool),
            revoked: AtomicBool::new(false),
            loaded_at: Utc::now(),
        }
    }

    /// Access the module.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotInitialized`] once the handle was released.
    pub fn module(&self) -> RuntimeResult<&dyn ComputeModule> {
        if self.is_live() {
            Ok(self.module.as_ref())
        } else {
            Err(RuntimeError::NotInitialized)
        }
    }

    /// `false` after dispose or abort.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.revoked.load(Ordering::Acquire)
    }

    /// Queue `job` on the handle's worker pool.
    ///
    /// Returns `Ok(false)` when the handle has no pool (single-threaded
    /// variant) and the caller should run the work itself.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotInitialized`] once the handle was released.
    pub fn execute_on_worker<F>(&self, job: F) -> RuntimeResult<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_live() {
            return Err(RuntimeError::NotInitialized);
        }
        match self.worker_pool.lock().as_ref() {
            Some(pool) => pool
                .execute(job)
                .map(|()| true)
                .map_err(|_| RuntimeError::NotInitialized),
            None => Ok(false),
        }
    }

    /// Revoke the handle and terminate its workers.
    ///
    /// Idempotent. Returns the number of workers signalled to stop.
    pub fn release(&self) -> usize {
        if self.revoked.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let terminated = self
            .worker_pool
            .lock()
            .take()
            .map_or(0, |pool| pool.terminate_all_threads());
        info!(
            instance_id = %self.instance_id,
            variant = %self.report.variant,
            terminated_workers = terminated,
            "Module handle released"
        );
        terminated
    }

    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    #[must_use]
    pub fn variant(&self) -> VariantName {
        self.report.variant
    }

    #[must_use]
    pub fn capabilities(&self) -> CapabilityFlags {
        self.report.capabilities
    }

    #[must_use]
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    #[must_use]
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Number of workers still owned (0 after release).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_pool.lock().as_ref().map_or(0, WorkerPool::size)
    }
}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("instance_id", &self.instance_id)
            .field("variant", &self.report.variant)
            .field("live", &self.is_live())
            .field("workers", &self.worker_count())
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}
