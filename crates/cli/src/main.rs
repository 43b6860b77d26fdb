use anyhow::{bail, Result};
use bcprov_cli::commands::{capture_command, extract_command, resolve_command};
use bcprov_core::model::BuildSystem;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Source provenance recovery for bitcode-instrumented binaries.
///
/// This CLI is a thin wrapper around `bcprov-core` (exposed in code as
/// `bcprov_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "bcprov",
    version,
    about = "Recover the original source files of a bitcode-instrumented binary",
    long_about = None
)]
struct Cli {
    /// Print a step-by-step transcript of every command and decision made.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configure and compile a project under the wllvm compiler wrapper so
    /// every translation unit's bitcode is embedded in the build outputs.
    Capture {
        /// Directory of the project to build.
        project_dir: String,

        /// The project is configured with autotools (./configure).
        #[arg(long, short = 'A', conflicts_with = "cmake")]
        autotools: bool,

        /// The project is configured with cmake.
        #[arg(long, short = 'C')]
        cmake: bool,

        /// Comma-delimited override arguments for the configuration step.
        #[arg(long, allow_hyphen_values = true)]
        args: Option<String>,
    },

    /// Classify a built artifact, extract its embedded bitcode, and publish
    /// the per-unit manifest as MANIFEST.txt next to the artifact.
    Extract {
        /// Path to the built executable or shared object.
        artifact: String,

        /// Emit the extraction report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Resolve every bitcode unit in a manifest back to the absolute path
    /// of the source file that produced it.
    Resolve {
        /// Path to the manifest (MANIFEST.txt).
        #[arg(long, short = 'M')]
        manifest: String,

        /// Root directory of the project the artifact was built from.
        project_dir: String,

        /// Emit the resolution report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Capture { project_dir, autotools, cmake, args } => {
            let system = if autotools {
                BuildSystem::Autotools
            } else if cmake {
                BuildSystem::Cmake
            } else {
                bail!("No build engine is specified; pass --autotools or --cmake.");
            };
            capture_command(&project_dir, system, args.as_deref(), cli.verbose)?
        }
        Command::Extract { artifact, json } => extract_command(&artifact, json, cli.verbose)?,
        Command::Resolve { manifest, project_dir, json } => {
            resolve_command(&manifest, &project_dir, json, cli.verbose)?
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
