//! WebAssembly runtime bootstrap CLI
//!
//! # Commands
//!
//! - `probe`: Report thread and SIMD support of the local engine
//! - `variant`: Print the variant selected for given capabilities
//! - `init`: Initialize the runtime, print the load report, dispose
//!
//! Exit codes follow `RuntimeError::exit_code()` (101-108); `0` on success.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// WebAssembly runtime bootstrap - capability probing and variant loading
#[derive(Parser)]
#[command(name = "wasm-bootstrap")]
#[command(version)]
#[command(about = "Probe, select and load the WebAssembly inference runtime")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which optional engine features this host supports
    Probe(commands::probe::ProbeArgs),
    /// Print the variant name for a capability combination
    ///
    /// Pure lookup: does not touch the engine.
    Variant(commands::variant::VariantArgs),
    /// Initialize the runtime and print the load report
    ///
    /// Configuration is read from WASM_BOOTSTRAP_* environment variables;
    /// flags override them.
    Init(commands::init::InitArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Probe(args) => commands::probe::handle_probe(args),
        Commands::Variant(args) => commands::variant::handle_variant(args),
        Commands::Init(args) => commands::init::handle_init(args).await,
    };

    std::process::exit(exit_code);
}
