//! Artifact classification from the ELF header.
//!
//! Only a fixed, small prefix of the file is read: the 16-byte
//! identification block is skipped and the 2-byte `e_type` field decoded.
//! Read-only; the artifact is never mutated.

use std::fs;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::PipelineError;
use crate::model::ExecutableType;

const ELF_IDENT_LEN: usize = 16;
const E_TYPE_LEN: usize = 2;

/// Decide how the artifact's embedded bitcode must be extracted.
///
/// Fails with `InputInvalid` when the path is missing or not a regular
/// file, and with `UnsupportedFormat` when the header is truncated or the
/// decoded type is neither an executable nor a shared object.
pub fn classify_artifact(artifact: &Path) -> Result<ExecutableType, PipelineError> {
    let metadata = fs::metadata(artifact).map_err(|_| {
        PipelineError::InputInvalid(format!("artifact {} does not exist", artifact.display()))
    })?;
    if !metadata.is_file() {
        return Err(PipelineError::InputInvalid(format!(
            "artifact {} is not a regular file",
            artifact.display()
        )));
    }

    let mut file = fs::File::open(artifact).map_err(|e| {
        PipelineError::InputInvalid(format!("cannot open artifact {}: {e}", artifact.display()))
    })?;
    let mut header = [0u8; ELF_IDENT_LEN + E_TYPE_LEN];
    file.read_exact(&mut header).map_err(|_| {
        PipelineError::UnsupportedFormat(format!(
            "{} is shorter than the ELF type field",
            artifact.display()
        ))
    })?;

    let e_type = u16::from_le_bytes([header[ELF_IDENT_LEN], header[ELF_IDENT_LEN + 1]]);
    match ExecutableType::from_e_type(e_type) {
        Some(kind) if kind.is_supported() => {
            debug!(artifact = %artifact.display(), ?kind, "classified artifact");
            Ok(kind)
        }
        _ => Err(PipelineError::UnsupportedFormat(format!(
            "e_type {e_type} of {} is neither an executable nor a shared object",
            artifact.display()
        ))),
    }
}
