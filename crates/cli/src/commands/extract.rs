use std::path::PathBuf;

use anyhow::{Context, Result};
use bcprov_core::model::ExecutableType;
use bcprov_core::services::classify::classify_artifact;
use bcprov_core::services::extract::{extract_manifest, ExtractOptions};
use bcprov_core::services::process::Transcript;
use serde::Serialize;

use crate::{absolutize_input, now_rfc3339, sha256_file};

/// Provenance report for one extraction run.
#[derive(Debug, Serialize)]
pub struct ExtractReport {
    pub artifact: PathBuf,
    pub artifact_sha256: String,
    pub executable_type: ExecutableType,
    pub combined_bitcode: PathBuf,
    pub disassembled_ir: PathBuf,
    pub manifest: PathBuf,
    pub started_at: String,
    pub finished_at: String,
}

/// Classify a built artifact, extract its embedded bitcode, and publish the
/// per-unit manifest under the well-known name.
pub fn extract_command(artifact: &str, json: bool, verbose: bool) -> Result<()> {
    let artifact = absolutize_input(artifact)?;
    let started_at = now_rfc3339();

    let mut transcript = Transcript::new();
    let result = classify_artifact(&artifact).and_then(|kind| {
        extract_manifest(&artifact, kind, &ExtractOptions::default(), &mut transcript)
            .map(|outputs| (kind, outputs))
    });

    let (kind, outputs) = match result {
        Ok(value) => value,
        Err(e) => {
            if verbose {
                eprint!("{}", transcript.render());
            }
            return Err(e).context("Manifest extraction failed");
        }
    };

    let report = ExtractReport {
        artifact_sha256: sha256_file(&artifact)?,
        artifact,
        executable_type: kind,
        combined_bitcode: outputs.combined_bitcode,
        disassembled_ir: outputs.disassembled_ir,
        manifest: outputs.manifest_path,
        started_at,
        finished_at: now_rfc3339(),
    };

    if verbose {
        print!("{}", transcript.render());
    }

    if json {
        let serialized =
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", serialized);
    } else {
        println!("Extracted bitcode manifest:");
        println!("  Artifact: {}", report.artifact.display());
        println!("  SHA-256: {}", report.artifact_sha256);
        println!("  Type: {:?}", report.executable_type);
        println!("  Combined bitcode: {}", report.combined_bitcode.display());
        println!("  Disassembled IR: {}", report.disassembled_ir.display());
        println!("  Manifest: {}", report.manifest.display());
    }

    Ok(())
}
