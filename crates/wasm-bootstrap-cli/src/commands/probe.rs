//! Probe command: report engine capabilities.

use clap::Args;
use tracing::{error, info};

use wasm_bootstrap_core::{CapabilityFlags, InitConfig, RuntimeError, WasmtimeHost};

/// Arguments for the probe command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Requested thread count (0 = auto, 1 = single-threaded)
    #[arg(long, default_value = "0")]
    pub threads: usize,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Execute the probe command.
///
/// # Returns
///
/// Exit code: `0` on success, `108` if no engine could be created.
pub fn handle_probe(args: ProbeArgs) -> i32 {
    let host = match WasmtimeHost::new() {
        Ok(host) => host,
        Err(source) => {
            let e = RuntimeError::HostUnavailable { source };
            error!(error_code = e.error_code(), "{}", e);
            return e.exit_code();
        }
    };

    let requested = InitConfig {
        num_threads: args.threads,
        ..Default::default()
    }
    .resolved_num_threads();
    let flags = CapabilityFlags::detect(&host, requested);
    info!(requested_threads = requested, ?flags, "Probe finished");

    if args.json {
        match serde_json::to_string_pretty(&flags) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!("Failed to serialize capabilities: {}", e);
                return 1;
            }
        }
    } else {
        println!("requested threads: {requested}");
        println!("threads supported: {}", flags.threads_supported);
        println!("simd supported:    {}", flags.simd_supported);
    }
    0
}
