//! Manifest extraction from a classified build artifact.
//!
//! `extract-bc` produces two side effects next to the artifact: a combined
//! bitcode file `<artifact>.bc` and a manifest `<artifact>.llvm.manifest`
//! listing the per-unit bitcode files that were embedded. This stage then
//! disassembles the combined bitcode to text IR and, only once both tool
//! calls have succeeded, publishes the manifest under its well-known name.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::model::{
    ExecutableType, BC_EXTENSION, EXTRACTOR_MANIFEST_SUFFIX, IR_EXTENSION, MANIFEST_FILE_NAME,
};
use crate::services::process::{Invocation, Transcript};
use crate::services::tools::{self, Disassembler};

/// Options for one extraction run.
#[derive(Debug, Default)]
pub struct ExtractOptions {
    /// Explicit `extract-bc` path; falls back to `EXTRACT_BC_BIN`.
    pub extract_bc_bin: Option<PathBuf>,
    /// Explicit `llvm-dis` path; falls back to `LLVM_DIS_BIN`.
    pub llvm_dis_bin: Option<PathBuf>,
}

/// On-disk products of a fully successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOutputs {
    /// Combined bitcode of the whole artifact (`<artifact>.bc`).
    pub combined_bitcode: PathBuf,
    /// Disassembled text IR of the combined bitcode (`<stem>.ll`).
    pub disassembled_ir: PathBuf,
    /// The manifest under its well-known name, next to the artifact.
    pub manifest_path: PathBuf,
}

/// Extract the embedded bitcode and publish the unit manifest.
///
/// Ordering is strict: extraction must succeed before disassembly is
/// attempted, and disassembly before the manifest is renamed. The
/// well-known `MANIFEST.txt` therefore only exists after a fully
/// successful run; partial outputs of a failed run are left in place for
/// the caller to inspect or clean up.
pub fn extract_manifest(
    artifact: &Path,
    kind: ExecutableType,
    options: &ExtractOptions,
    transcript: &mut Transcript,
) -> Result<ExtractOutputs, PipelineError> {
    if !kind.is_supported() {
        return Err(PipelineError::UnsupportedFormat(format!(
            "artifact {} has no extractable bitcode",
            artifact.display()
        )));
    }
    if !artifact.is_file() {
        return Err(PipelineError::InputInvalid(format!(
            "artifact {} is not a regular file",
            artifact.display()
        )));
    }

    let extract_bin = tools::extract_bc(options.extract_bc_bin.clone());
    let mut extract = Invocation::new(&extract_bin).arg("--manifest");
    if kind == ExecutableType::SharedObject {
        extract = extract.arg("--bitcode");
    }
    extract = extract.arg(artifact);

    let report = extract.run(transcript).map_err(|e| {
        PipelineError::ExtractionFailed(format!("failed to spawn {}: {e}", extract_bin.display()))
    })?;
    if !report.success() {
        return Err(PipelineError::ExtractionFailed(format!(
            "{} {}",
            extract_bin.display(),
            report.failure_summary()
        )));
    }

    let combined_bitcode = append_suffix(artifact, &format!(".{BC_EXTENSION}"));
    let directory = artifact.parent().unwrap_or_else(|| Path::new("."));
    let stem = artifact.file_stem().unwrap_or_default().to_string_lossy().to_string();
    let disassembled_ir = directory.join(format!("{stem}.{IR_EXTENSION}"));

    let disassembler = tools::LlvmDis::new(options.llvm_dis_bin.clone());
    disassembler.disassemble(&combined_bitcode, &disassembled_ir, transcript)?;

    let extractor_manifest = append_suffix(artifact, EXTRACTOR_MANIFEST_SUFFIX);
    let manifest_path = directory.join(MANIFEST_FILE_NAME);
    transcript
        .note(format!("mv {} {}", extractor_manifest.display(), manifest_path.display()));
    fs::rename(&extractor_manifest, &manifest_path).map_err(|e| {
        PipelineError::ExtractionFailed(format!(
            "cannot publish manifest {}: {e}",
            extractor_manifest.display()
        ))
    })?;

    debug!(
        artifact = %artifact.display(),
        manifest = %manifest_path.display(),
        "extraction complete"
    );

    Ok(ExtractOutputs { combined_bitcode, disassembled_ir, manifest_path })
}

/// Append a literal suffix to a path without touching its existing
/// extension (`app.so` -> `app.so.bc`).
fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}
