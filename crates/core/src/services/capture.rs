//! Build capture: drive an external build so every compiled translation
//! unit's bitcode ends up embedded in the produced objects and binaries.
//!
//! The instrumented-compiler environment is scoped to the spawned
//! subprocesses; neither the environment nor the working directory of the
//! calling process is ever mutated.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PipelineError;
use crate::model::BuildSystem;
use crate::services::process::{Invocation, Transcript};
use crate::services::tools;

const COMPILER_ENV_KEY: &str = "LLVM_COMPILER";
const COMPILER_ENV_VALUE: &str = "clang";
const CC_ENV_KEY: &str = "CC";
const CC_ENV_VALUE: &str = "wllvm";
const CONFIGURE_SCRIPT: &str = "configure";
const OPTIMIZATION: &str = "CFLAGS=-O0";

/// Options for one capture run.
#[derive(Debug, Default)]
pub struct CaptureOptions {
    /// Literal override arguments for the configuration step. When empty,
    /// autotools runs `./configure` bare and cmake runs `cmake .`.
    pub build_args: Vec<String>,
    /// Explicit `make` path; falls back to `MAKE_BIN`, then `make`.
    pub make_bin: Option<PathBuf>,
    /// Explicit `cmake` path; falls back to `CMAKE_BIN`, then `cmake`.
    pub cmake_bin: Option<PathBuf>,
}

/// Configure and compile the project under the wllvm wrapper.
///
/// Runs the configuration step for the selected build system, then the
/// fixed `make CFLAGS=-O0` compilation step, both inside `project_dir`.
/// Fail-fast: a failing configuration step skips compilation entirely.
pub fn capture_build(
    project_dir: &Path,
    system: BuildSystem,
    options: &CaptureOptions,
    transcript: &mut Transcript,
) -> Result<(), PipelineError> {
    if !project_dir.is_dir() {
        return Err(PipelineError::InputInvalid(format!(
            "project path {} is not a directory",
            project_dir.display()
        )));
    }

    let mut configure = match system {
        BuildSystem::Autotools => Invocation::new(project_dir.join(CONFIGURE_SCRIPT)),
        BuildSystem::Cmake => Invocation::new(tools::cmake(options.cmake_bin.clone())),
    };
    configure = configure
        .current_dir(project_dir)
        .env(COMPILER_ENV_KEY, COMPILER_ENV_VALUE)
        .env(CC_ENV_KEY, CC_ENV_VALUE);

    if options.build_args.is_empty() {
        if system == BuildSystem::Cmake {
            configure = configure.arg(".");
        }
    } else {
        configure = configure.args(&options.build_args);
    }

    debug!(project = %project_dir.display(), ?system, "starting build capture");
    run_step(configure, "configuration", transcript)?;

    let compile = Invocation::new(tools::make(options.make_bin.clone()))
        .arg(OPTIMIZATION)
        .current_dir(project_dir)
        .env(COMPILER_ENV_KEY, COMPILER_ENV_VALUE);
    run_step(compile, "compilation", transcript)?;

    Ok(())
}

fn run_step(
    invocation: Invocation,
    step: &str,
    transcript: &mut Transcript,
) -> Result<(), PipelineError> {
    let program = invocation.program().display().to_string();
    let report = match invocation.run(transcript) {
        Ok(report) => report,
        Err(e) => {
            transcript.note("*** an error occurred, abort");
            return Err(PipelineError::BuildFailed(format!(
                "{step}: failed to spawn {program}: {e}"
            )));
        }
    };
    if !report.success() {
        transcript.note("*** an error occurred, abort");
        return Err(PipelineError::BuildFailed(format!(
            "{step}: {program} {}",
            report.failure_summary()
        )));
    }
    Ok(())
}
