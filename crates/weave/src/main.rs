mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use weave_core::feature::FeatureCatalog;
use weave_core::kernel::{ComposeOptions, Kernel};
use weave_core::reload::dynamo;
use weave_core::runtime::Runtime;
use weave_core::KernelError;

use crate::cli::CliArgs;

/// Every module this binary can load, by `dependencies` name.
fn bundled_catalog() -> Result<FeatureCatalog, KernelError> {
    let mut catalog = FeatureCatalog::new();
    catalog.register(weave_logger::module())?;
    catalog.register(weave_hello::module())?;
    catalog.register(dynamo::module())?;
    Ok(catalog)
}

/// Whether the program asked the orchestrator to watch anything.
fn live_reload_enabled(kernel: &Kernel) -> bool {
    if kernel.feature(dynamo::FEATURE_NAME).is_none() {
        return false;
    }
    ["core", "config", "features"]
        .iter()
        .any(|scope| kernel.config().get_or(&format!("dynamo.{}", scope), false))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let catalog = match bundled_catalog() {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            eprintln!("weave: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = ComposeOptions::new(&args.config_root, args.command_line());

    let runtime = match Runtime::start(catalog, options) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to compose program: {}", e);
            eprintln!("weave: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let watching = runtime.current().is_some_and(|kernel| live_reload_enabled(&kernel));
    if watching {
        info!("Live reloading enabled, press Ctrl-C to exit.");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
        }
    }

    runtime.shutdown();
    ExitCode::SUCCESS
}
