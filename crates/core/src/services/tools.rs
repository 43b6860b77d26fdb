//! Discovery of the external LLVM and build toolchain.
//!
//! Precedence for every tool: an explicit path from the caller, then an
//! environment variable, then the bare tool name resolved through `PATH`.
//! The environment fallbacks also keep tests hermetic: a test can point a
//! tool at a stand-in script without touching the real toolchain.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::services::process::{Invocation, Transcript};

fn tool_path(explicit: Option<PathBuf>, env_var: &str, default: &str) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    env::var_os(env_var).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default))
}

/// `extract-bc` from the wllvm toolchain.
pub fn extract_bc(explicit: Option<PathBuf>) -> PathBuf {
    tool_path(explicit, "EXTRACT_BC_BIN", "extract-bc")
}

/// `llvm-dis` from the LLVM toolchain.
pub fn llvm_dis(explicit: Option<PathBuf>) -> PathBuf {
    tool_path(explicit, "LLVM_DIS_BIN", "llvm-dis")
}

/// `make`, used as the fixed compilation step of the capture stage.
pub fn make(explicit: Option<PathBuf>) -> PathBuf {
    tool_path(explicit, "MAKE_BIN", "make")
}

/// `cmake`, used as one of the two configuration drivers.
pub fn cmake(explicit: Option<PathBuf>) -> PathBuf {
    tool_path(explicit, "CMAKE_BIN", "cmake")
}

/// Trait seam over bitcode-to-text disassembly so the resolver can be
/// exercised without an LLVM toolchain installed.
pub trait Disassembler: Send + Sync {
    /// Disassemble `bitcode` into the text IR file at `output`, overwriting
    /// whatever is there.
    fn disassemble(
        &self,
        bitcode: &Path,
        output: &Path,
        transcript: &mut Transcript,
    ) -> Result<(), PipelineError>;

    fn name(&self) -> &'static str;
}

/// Disassembler backed by the real `llvm-dis` binary.
pub struct LlvmDis {
    path: PathBuf,
}

impl LlvmDis {
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { path: llvm_dis(explicit) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Disassembler for LlvmDis {
    fn disassemble(
        &self,
        bitcode: &Path,
        output: &Path,
        transcript: &mut Transcript,
    ) -> Result<(), PipelineError> {
        let invocation = Invocation::new(&self.path).arg(bitcode).arg("-o").arg(output);
        let report = invocation.run(transcript).map_err(|e| {
            PipelineError::DisassemblyFailed(format!(
                "failed to spawn {}: {e}",
                self.path.display()
            ))
        })?;
        if !report.success() {
            return Err(PipelineError::DisassemblyFailed(format!(
                "{} {}",
                self.path.display(),
                report.failure_summary()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "llvm-dis"
    }
}
