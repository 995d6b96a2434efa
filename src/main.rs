//! gkibuild CLI
//!
//! Builds a customized Android GKI kernel (KernelSU + SUSFS, optional
//! LZ4KD and KPM) and packages it as an AnyKernel3 flashable archive.
//!
//! # Usage
//!
//! ```bash
//! # List supported device profiles
//! gkibuild devices
//!
//! # Build with fixed defaults
//! gkibuild build
//!
//! # Build a specific target with features enabled
//! gkibuild build --device gki-android14-6.1 --kpm --lz4kd
//!
//! # Answer prompts interactively
//! gkibuild build --interactive
//!
//! # CI: answers come from DEVICE_NAME/KERNEL_SUFFIX/ENABLE_* variables
//! gkibuild build --ci
//!
//! # Show the patch plan without touching the network
//! gkibuild build --dry-run
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use gkibuild::config::{self, SelectionMode, SelectionOverrides};
use gkibuild::kernel::sources::DeviceDb;
use gkibuild::models::CleanupPolicy;
use gkibuild::orchestrator::{BuildOutcome, Orchestrator};
use gkibuild::LogCollector;

#[derive(Parser)]
#[command(name = "gkibuild")]
#[command(author, version, about = "GKI kernel builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full build pipeline
    Build(BuildArgs),

    /// List supported device profiles
    Devices,
}

#[derive(Args)]
struct BuildArgs {
    /// Device profile (see `gkibuild devices`)
    #[arg(long)]
    device: Option<String>,

    /// Manifest filename for repo init -m
    #[arg(long)]
    manifest: Option<String>,

    /// Literal kernel version suffix, e.g. "-android14-11-o-g1234"
    #[arg(long)]
    suffix: Option<String>,

    /// Enable the KPM boot-image post-patch
    #[arg(long)]
    kpm: bool,

    /// Enable the LZ4K/LZ4KD compression patch set
    #[arg(long)]
    lz4kd: bool,

    /// Fill unset answers from terminal prompts
    #[arg(long, conflicts_with = "ci")]
    interactive: bool,

    /// Fill unset answers from CI environment variables
    #[arg(long)]
    ci: bool,

    /// Log the patch plan and stop before any external tool runs
    #[arg(long)]
    dry_run: bool,

    /// Parallelism for repo sync and make (defaults to CPU count)
    #[arg(long)]
    jobs: Option<u32>,

    /// Workspace root directory
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Delete the synced tree and companions after a successful run
    #[arg(long)]
    purge_workspace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Devices => {
            let db = DeviceDb::new();
            for device in db.available_devices() {
                println!("{}", device);
            }
            Ok(())
        }
        Commands::Build(args) => run_build(args).await,
    }
}

async fn run_build(args: BuildArgs) -> Result<()> {
    let mode = if args.interactive {
        SelectionMode::Interactive
    } else if args.ci {
        SelectionMode::Ci
    } else {
        SelectionMode::Fixed
    };

    // Feature switches only override when set; absent flags defer to the
    // selected mode's answers.
    let overrides = SelectionOverrides {
        device: args.device,
        manifest: args.manifest,
        kernel_suffix: args.suffix,
        enable_kpm: args.kpm.then_some(true),
        enable_lz4kd: args.lz4kd.then_some(true),
        cleanup: args.purge_workspace.then_some(CleanupPolicy::Purge),
        jobs: args.jobs,
        workspace: args.workspace,
    };

    let build_config = config::select(mode, overrides, args.dry_run)
        .context("configuration selection failed")?;

    // Logging must be live before the first pipeline step; every log::*
    // line lands on stderr and in logs/<timestamp>.log.
    let logs_dir = build_config.workspace.join("logs");
    let transcript = LogCollector::new(&logs_dir)
        .context("failed to open the run log")?
        .install()
        .context("failed to install the logger")?;
    log::info!("gkibuild {} starting (log: {})", gkibuild::VERSION, transcript.display());

    let mut orchestrator = Orchestrator::new(build_config)?;
    match orchestrator.run().await {
        Ok(BuildOutcome::Completed(artifacts)) => {
            log::logger().flush();
            println!();
            println!("Build complete.");
            println!("  KernelSU version: {}", artifacts.ksu_version);
            println!("  Image:   {}", artifacts.image.display());
            println!("  Archive: {}", artifacts.archive.display());
            Ok(())
        }
        Ok(BuildOutcome::DryRun { planned_steps }) => {
            log::logger().flush();
            println!();
            println!("Dry run complete: {} patch steps planned.", planned_steps);
            Ok(())
        }
        Err(e) => {
            log::logger().flush();
            Err(e).context("pipeline aborted")
        }
    }
}
