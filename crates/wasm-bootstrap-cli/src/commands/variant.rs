//! Variant command: deterministic variant lookup.

use clap::Args;

use wasm_bootstrap_core::{select_variant, BuildFlags, VariantName};

/// Arguments for the variant command.
#[derive(Args, Debug)]
pub struct VariantArgs {
    /// SIMD is supported
    #[arg(long)]
    pub simd: bool,

    /// Threads are supported
    #[arg(long)]
    pub threads: bool,

    /// Training build
    #[arg(long)]
    pub training: bool,

    /// Build without the JSEP sub-variants
    #[arg(long)]
    pub no_jsep: bool,

    /// Also print the asset file names
    #[arg(long)]
    pub files: bool,
}

fn variant_for(args: &VariantArgs) -> VariantName {
    let flags = BuildFlags {
        disable_training: !args.training,
        disable_jsep: args.no_jsep,
        disable_wasm_thread: false,
    };
    select_variant(args.simd, args.threads, flags)
}

/// Execute the variant command. Always succeeds.
pub fn handle_variant(args: VariantArgs) -> i32 {
    let variant = variant_for(&args);
    println!("{variant}");
    if args.files {
        println!("{}", variant.wasm_file_name());
        println!("{}", variant.factory_file_name());
        println!("{}", variant.worker_file_name());
    }
    0
}
