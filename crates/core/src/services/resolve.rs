//! Source resolution: map every bitcode unit listed in a manifest back to
//! the absolute path of the source file that produced it.
//!
//! Each unit is disassembled into one reused scratch file and the module
//! header scanned for its `source_filename` declaration. Absolute declared
//! paths are accepted as-is; relative ones are resolved by climbing the
//! ancestor directories of the unit, nearest first, bounded by the project
//! root. The batch is all-or-nothing: one unresolved unit fails the whole
//! manifest and nothing is written.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use crate::error::PipelineError;
use crate::model::{Manifest, BC_EXTENSION, IR_EXTENSION, SOURCE_LIST_SUFFIX};
use crate::services::process::Transcript;
use crate::services::tools::Disassembler;

/// Module-header region scanned for the `source_filename` declaration.
/// The declaration conventionally sits on the first or second line; units
/// without one in this region are treated as missing it entirely.
pub const IR_HEADER_MAX_LINES: usize = 4;

const SOURCE_FILENAME_PATTERN: &str = r#"^\s*source_filename\s*=\s*"([^"]+)""#;

/// Resolves a manifest of bitcode units against a project root.
pub struct SourceResolver<'a> {
    disassembler: &'a dyn Disassembler,
    project_root: PathBuf,
    header_pattern: Regex,
}

impl<'a> SourceResolver<'a> {
    pub fn new(disassembler: &'a dyn Disassembler, project_root: impl Into<PathBuf>) -> Self {
        let header_pattern =
            Regex::new(SOURCE_FILENAME_PATTERN).expect("source_filename pattern is valid");
        Self { disassembler, project_root: project_root.into(), header_pattern }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve every unit listed in the manifest, in manifest order.
    ///
    /// On success the result has exactly one absolute path per manifest
    /// entry. On any per-unit failure the whole resolution fails and no
    /// partial result is returned.
    pub fn resolve_manifest(
        &self,
        manifest_path: &Path,
        transcript: &mut Transcript,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let text = fs::read_to_string(manifest_path).map_err(|e| {
            PipelineError::InputInvalid(format!(
                "cannot read manifest {}: {e}",
                manifest_path.display()
            ))
        })?;
        if text.is_empty() {
            return Err(PipelineError::InputInvalid(format!(
                "manifest {} is empty",
                manifest_path.display()
            )));
        }
        let manifest = Manifest::parse(&text);

        // One scratch file for the whole run, truncated before each unit.
        let scratch = tempfile::Builder::new()
            .prefix("bcprov-unit-")
            .suffix(&format!(".{IR_EXTENSION}"))
            .tempfile()
            .map_err(|e| {
                PipelineError::DisassemblyFailed(format!("cannot create scratch file: {e}"))
            })?;
        transcript.note(format!("scratch disassembly file {}", scratch.path().display()));

        let mut sources = Vec::with_capacity(manifest.len());
        for (index, unit) in manifest.units.iter().enumerate() {
            transcript.note(format!("{}. bitcode unit {}", index + 1, unit.display()));
            let resolved = self.resolve_unit(unit, scratch.path(), transcript)?;
            transcript.note(format!("--> {}", resolved.display()));
            sources.push(resolved);
        }

        debug!(
            manifest = %manifest_path.display(),
            units = sources.len(),
            "manifest fully resolved"
        );
        Ok(sources)
    }

    fn resolve_unit(
        &self,
        unit: &Path,
        scratch: &Path,
        transcript: &mut Transcript,
    ) -> Result<PathBuf, PipelineError> {
        if !unit.exists() {
            return Err(PipelineError::ManifestCorrupt(format!(
                "listed unit {} does not exist",
                unit.display()
            )));
        }
        if unit.extension().and_then(|e| e.to_str()) != Some(BC_EXTENSION) {
            return Err(PipelineError::ManifestCorrupt(format!(
                "listed unit {} is not a bitcode file",
                unit.display()
            )));
        }

        truncate_scratch(scratch)?;
        self.disassembler.disassemble(unit, scratch, transcript)?;

        let declared = self
            .scan_header(scratch)?
            .ok_or_else(|| PipelineError::SourceFilenameMissing(unit.to_path_buf()))?;
        transcript.note(format!("source_filename \"{declared}\""));

        let declared = PathBuf::from(declared);
        if declared.is_absolute() {
            // Absolute embedded paths are accepted without further search.
            return Ok(declared);
        }

        let start = unit.parent().unwrap_or_else(|| Path::new("/"));
        match climb_for_source(start, &declared, &self.project_root) {
            Some(found) => Ok(found),
            None => {
                transcript.note(format!(
                    "*** {} not found under {}",
                    declared.display(),
                    self.project_root.display()
                ));
                Err(PipelineError::SourceNotFound {
                    unit: unit.to_path_buf(),
                    project_root: self.project_root.clone(),
                })
            }
        }
    }

    /// Scan only the first [`IR_HEADER_MAX_LINES`] lines of the disassembled
    /// unit, stopping at the first `source_filename` match.
    fn scan_header(&self, ir_text: &Path) -> Result<Option<String>, PipelineError> {
        let file = fs::File::open(ir_text).map_err(|e| {
            PipelineError::DisassemblyFailed(format!(
                "cannot open disassembled unit {}: {e}",
                ir_text.display()
            ))
        })?;
        for line in BufReader::new(file).lines().take(IR_HEADER_MAX_LINES) {
            let line = line.map_err(|e| {
                PipelineError::DisassemblyFailed(format!(
                    "cannot read disassembled unit {}: {e}",
                    ir_text.display()
                ))
            })?;
            if let Some(captures) = self.header_pattern.captures(&line) {
                return Ok(Some(captures[1].to_string()));
            }
        }
        Ok(None)
    }
}

/// Truncate the reused scratch file and verify it is actually empty before
/// the next unit is disassembled into it.
fn truncate_scratch(scratch: &Path) -> Result<(), PipelineError> {
    fs::File::create(scratch).map_err(|e| {
        PipelineError::DisassemblyFailed(format!(
            "cannot truncate scratch file {}: {e}",
            scratch.display()
        ))
    })?;
    let len = fs::metadata(scratch).map(|m| m.len()).unwrap_or(u64::MAX);
    if len != 0 {
        return Err(PipelineError::DisassemblyFailed(format!(
            "scratch file {} was not truncated",
            scratch.display()
        )));
    }
    Ok(())
}

/// Nearest-first directory climb for a relative source path.
///
/// Starting at the unit's own directory, the candidate `dir/<relative>` is
/// tested and, on a miss, `dir` moves to its parent. The climb is bounded
/// structurally: it continues only while the project root is a
/// component-wise ancestor of the candidate, and the parent chain ends at
/// the filesystem root, so termination does not depend on the root string
/// recurring in the path.
pub fn climb_for_source(
    start_dir: &Path,
    relative: &Path,
    project_root: &Path,
) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join(relative);
        if !candidate.starts_with(project_root) {
            return None;
        }
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Name of the final source list: the project directory's basename plus the
/// fixed suffix.
pub fn source_list_name(project_root: &Path) -> String {
    let name = project_root.file_name().and_then(|n| n.to_str()).unwrap_or("project");
    format!("{name}{SOURCE_LIST_SUFFIX}")
}

/// Persist the resolved list: one absolute path per line, newline
/// terminated, in manifest order. Only called after a fully successful
/// resolution.
pub fn write_source_list(output: &Path, sources: &[PathBuf]) -> io::Result<()> {
    let mut body = String::new();
    for source in sources {
        body.push_str(&source.to_string_lossy());
        body.push('\n');
    }
    fs::write(output, body)
}
