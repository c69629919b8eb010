//! Init command: initialize the runtime through the global accessors.
//!
//! # Usage
//!
//! ```bash
//! # Load from a prefix with a 5 second budget
//! wasm-bootstrap init --wasm-prefix /opt/ort/dist/ --timeout-ms 5000
//!
//! # Rename a single binary
//! wasm-bootstrap init --wasm-paths '{"ort-wasm-simd.wasm": "/srv/custom.wasm"}'
//! ```

use std::sync::Arc;

use clap::Args;
use tracing::{error, info};

use wasm_bootstrap_core::{
    dispose, get_instance, initialize_runtime, install_global_runtime, runtime_status_message,
    InitConfig, RuntimeError, RuntimeManager, WasmPaths, WasmtimeHost,
};

/// Arguments for the init command.
#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Requested thread count (0 = auto, 1 = single-threaded)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Never select a SIMD variant
    #[arg(long)]
    pub no_simd: bool,

    /// Instantiation budget in milliseconds (0 = no timeout)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Path prefix prepended to every asset file name
    #[arg(long, conflicts_with = "wasm_paths")]
    pub wasm_prefix: Option<String>,

    /// JSON object mapping asset file names to locations
    #[arg(long)]
    pub wasm_paths: Option<String>,

    /// Directory holding the co-located assets
    #[arg(long)]
    pub asset_dir: Option<String>,

    /// Keep the runtime loaded until Ctrl-C instead of disposing at once
    #[arg(long)]
    pub hold: bool,
}

/// Merge flags over the environment configuration.
fn build_config(args: &InitArgs, mut config: InitConfig) -> Result<InitConfig, RuntimeError> {
    if let Some(threads) = args.threads {
        config.num_threads = threads;
    }
    if args.no_simd {
        config.simd = false;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.init_timeout_ms = timeout_ms;
    }
    if let Some(prefix) = &args.wasm_prefix {
        config.wasm_paths = Some(WasmPaths::Prefix(prefix.clone()));
    }
    if let Some(raw) = &args.wasm_paths {
        let paths = serde_json::from_str::<WasmPaths>(raw).map_err(|e| RuntimeError::InvalidConfig {
            field: "wasm_paths".to_string(),
            reason: format!("expected a JSON string or object: {e}"),
        })?;
        config.wasm_paths = Some(paths);
    }
    config.validate()?;
    Ok(config)
}

/// Execute the init command.
///
/// # Returns
///
/// Exit code: `0` on success, otherwise `RuntimeError::exit_code()`.
pub async fn handle_init(args: InitArgs) -> i32 {
    let config = match build_config(&args, InitConfig::from_env()) {
        Ok(config) => config,
        Err(e) => return report_failure(&e),
    };

    let host = match WasmtimeHost::new() {
        Ok(host) => host,
        Err(source) => return report_failure(&RuntimeError::HostUnavailable { source }),
    };
    let mut manager = RuntimeManager::new(Arc::new(host));
    if let Some(dir) = &args.asset_dir {
        manager = manager.with_script_directory(dir.clone());
    }
    if install_global_runtime(manager).is_err() {
        error!("Global runtime was already installed");
        return 1;
    }

    let report = match initialize_runtime(&config).await {
        Ok(report) => report,
        Err(e) => return report_failure(&e),
    };
    info!("Loaded {}", report.summary_line());

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!("Failed to serialize load report: {}", e);
            dispose();
            return 1;
        }
    }

    if args.hold {
        if let Ok(handle) = get_instance() {
            info!(instance_id = %handle.instance_id(), "Runtime held; press Ctrl-C to dispose");
        }
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for Ctrl-C: {}", e);
        }
    }

    dispose();
    info!("Status: {}", runtime_status_message());
    0
}

fn report_failure(e: &RuntimeError) -> i32 {
    error!(
        error_code = e.error_code(),
        category = e.category(),
        retry_with_fallback = e.is_retryable_with_fallback(),
        "{}",
        e
    );
    eprintln!("error: {e}");
    e.exit_code()
}
