use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds shared by all pipeline stages.
///
/// Every stage is fail-fast and all-or-nothing: the first error aborts the
/// run for the artifact being processed, and no partial output is published.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    #[error("Unsupported artifact format: {0}")]
    UnsupportedFormat(String),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Bitcode extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Disassembly failed: {0}")]
    DisassemblyFailed(String),

    #[error("Manifest corrupt: {0}")]
    ManifestCorrupt(String),

    #[error("No source_filename declaration in the header of {0}")]
    SourceFilenameMissing(PathBuf),

    #[error("Source for unit {unit} not found under {project_root}")]
    SourceNotFound { unit: PathBuf, project_root: PathBuf },
}
