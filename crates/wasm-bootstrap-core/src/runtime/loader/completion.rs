//! Instantiation task and its terminal transition.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::handle::ModuleHandle;
use crate::runtime::host::{InstantiateRequest, WasmHost};
use crate::runtime::lifecycle::LifecycleMachine;
use crate::runtime::state::AbortCause;

use super::plan::LoadPlan;
use super::report::LoadReport;

/// Instantiate the planned variant and settle the lifecycle.
///
/// Runs as a detached task so that it finishes even after the caller stopped
/// waiting. A result arriving after the lifecycle left `Initializing` is
/// released immediately.
pub(super) async fn instantiate_and_settle(
    host: Arc<dyn WasmHost>,
    lifecycle: Arc<LifecycleMachine>,
    plan: LoadPlan,
    request: InstantiateRequest,
    started: Instant,
) -> RuntimeResult<LoadReport> {
    match host.instantiate(request).await {
        Ok(instantiated) => {
            let report = plan.report(started.elapsed());
            let handle = ModuleHandle::new(report.clone(), instantiated.module, instantiated.worker_pool);

            match lifecycle.mark_ready(handle) {
                Ok(handle) => {
                    info!(
                        instance_id = %handle.instance_id(),
                        variant = %report.variant,
                        elapsed_ms = report.elapsed_ms,
                        "WebAssembly runtime ready"
                    );
                    Ok(report)
                }
                Err(late) => {
                    let terminated = late.release();
                    warn!(
                        variant = %report.variant,
                        elapsed_ms = report.elapsed_ms,
                        terminated_workers = terminated,
                        "Instantiation finished after the load was already aborted; result discarded"
                    );
                    Err(RuntimeError::PreviouslyAborted)
                }
            }
        }
        Err(source) => {
            lifecycle.mark_aborted(AbortCause::Failed(source.to_string()));
            Err(RuntimeError::InitFailed {
                variant: plan.variant.to_string(),
                source,
            })
        }
    }
}
