use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bcprov_core::services::process::Transcript;
use bcprov_core::services::resolve::{source_list_name, write_source_list, SourceResolver};
use bcprov_core::services::tools::LlvmDis;
use serde::Serialize;
use tracing::debug;

use crate::absolutize_input;

/// Summary of one resolution run.
#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub manifest: PathBuf,
    pub project_root: PathBuf,
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
}

/// Resolve every unit in the manifest to an absolute source path and write
/// the list to `<project-basename>_sources.txt` in the current directory.
///
/// All-or-nothing: any unresolved unit exits non-zero and leaves no output
/// file behind.
pub fn resolve_command(manifest: &str, project_dir: &str, json: bool, verbose: bool) -> Result<()> {
    let manifest_path = absolutize_input(manifest)?;
    if !manifest_path.exists() {
        bail!("Manifest file does not exist: {}", manifest_path.display());
    }
    if !manifest_path.is_file() {
        bail!("Manifest path is not a regular file: {}", manifest_path.display());
    }

    let project_root = absolutize_input(project_dir)?;
    if !project_root.exists() {
        bail!("Project path does not exist: {}", project_root.display());
    }
    if !project_root.is_dir() {
        bail!("Project path is not a directory: {}", project_root.display());
    }

    let disassembler = LlvmDis::new(None);
    let resolver = SourceResolver::new(&disassembler, &project_root);

    let mut transcript = Transcript::new();
    let sources = match resolver.resolve_manifest(&manifest_path, &mut transcript) {
        Ok(sources) => sources,
        Err(e) => {
            if verbose {
                eprint!("{}", transcript.render());
            }
            return Err(e).context("Source resolution failed");
        }
    };

    let output = PathBuf::from(source_list_name(&project_root));
    write_source_list(&output, &sources)
        .with_context(|| format!("Failed to write source list {}", output.display()))?;
    debug!(output = %output.display(), sources = sources.len(), "source list written");

    if verbose {
        print!("{}", transcript.render());
    }

    if json {
        let report = ResolveReport {
            manifest: manifest_path,
            project_root,
            output,
            sources,
        };
        let serialized =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", serialized);
    } else {
        println!("Resolved {} source file(s):", sources.len());
        for source in &sources {
            println!("  - {}", source.display());
        }
        print_output_location(&output);
    }

    Ok(())
}

fn print_output_location(output: &Path) {
    println!("Wrote source list to {}", output.display());
}
