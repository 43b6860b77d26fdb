//! Core data model for pipeline artifacts: built binaries, manifests, and
//! the fixed on-disk names the stages agree on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extension of a per-unit bitcode file.
pub const BC_EXTENSION: &str = "bc";
/// Extension of a disassembled, human-readable IR file.
pub const IR_EXTENSION: &str = "ll";
/// Well-known manifest name published next to the artifact after a fully
/// successful extraction.
pub const MANIFEST_FILE_NAME: &str = "MANIFEST.txt";
/// Suffix of the manifest as the extractor itself emits it.
pub const EXTRACTOR_MANIFEST_SUFFIX: &str = ".llvm.manifest";
/// Suffix of the final resolved source list, prefixed with the project
/// directory's basename.
pub const SOURCE_LIST_SUFFIX: &str = "_sources.txt";

const ET_NONE: u16 = 0;
const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;

/// Classification of a built artifact, decoded from the `e_type` field of
/// its ELF header. The type controls the extraction mode: shared objects
/// need bitcode-section extraction rather than symbol-table-driven
/// extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutableType {
    None,
    Executable,
    SharedObject,
}

impl ExecutableType {
    /// Decode a raw `e_type` value. Values other than the three known ones
    /// are not representable and yield `None`.
    pub fn from_e_type(e_type: u16) -> Option<Self> {
        match e_type {
            ET_NONE => Some(Self::None),
            ET_EXEC => Some(Self::Executable),
            ET_DYN => Some(Self::SharedObject),
            _ => None,
        }
    }

    /// Whether the pipeline can extract bitcode from this artifact type.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Executable | Self::SharedObject)
    }
}

/// Build system driving the capture stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildSystem {
    Autotools,
    Cmake,
}

/// Ordered list of per-unit bitcode paths extracted from a built artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub units: Vec<PathBuf>,
}

impl Manifest {
    /// Parse the line-oriented manifest format: one absolute bitcode path
    /// per line, with a blank line terminating the list early.
    pub fn parse(text: &str) -> Self {
        let mut units = Vec::new();
        for line in text.lines() {
            if line.is_empty() {
                break;
            }
            units.push(PathBuf::from(line));
        }
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
