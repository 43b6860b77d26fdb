use anyhow::{bail, Context, Result};
use bcprov_core::model::BuildSystem;
use bcprov_core::services::capture::{capture_build, CaptureOptions};
use bcprov_core::services::process::Transcript;
use tracing::debug;

use crate::absolutize_input;

/// Configure and compile a project under the instrumented compiler wrapper.
///
/// `args` is the raw comma-delimited override list for the configuration
/// step (e.g. `--with-openssl` or `.,-DFOO=1`); when absent the build
/// system's default invocation is used.
pub fn capture_command(
    project_dir: &str,
    system: BuildSystem,
    args: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let project = absolutize_input(project_dir)?;
    if !project.exists() {
        bail!("Project path does not exist: {}", project.display());
    }
    if !project.is_dir() {
        bail!("Project path is not a directory: {}", project.display());
    }

    let build_args: Vec<String> = args
        .map(|raw| raw.split(',').filter(|a| !a.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    debug!(project = %project.display(), ?system, "capture requested");
    let options = CaptureOptions { build_args, make_bin: None, cmake_bin: None };
    let mut transcript = Transcript::new();
    let result = capture_build(&project, system, &options, &mut transcript);

    if verbose {
        println!("==COMPILATION COMMANDS==");
        print!("{}", transcript.render());
        println!("==");
    }

    result.context("Build capture failed")?;
    println!("Success.");
    Ok(())
}
