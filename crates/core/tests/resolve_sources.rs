use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bcprov_core::services::process::Transcript;
use bcprov_core::services::resolve::{
    climb_for_source, source_list_name, write_source_list, SourceResolver,
};
use bcprov_core::services::tools::Disassembler;
use bcprov_core::PipelineError;
use tempfile::tempdir;

/// Stand-in for llvm-dis: writes a canned text-IR header per bitcode unit
/// and counts how often it was invoked.
#[derive(Default)]
struct FakeDisassembler {
    headers: HashMap<PathBuf, String>,
    calls: AtomicUsize,
}

impl FakeDisassembler {
    fn with_header(mut self, unit: &Path, header: &str) -> Self {
        self.headers.insert(unit.to_path_buf(), header.to_string());
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Disassembler for FakeDisassembler {
    fn disassemble(
        &self,
        bitcode: &Path,
        output: &Path,
        _transcript: &mut Transcript,
    ) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let header = self.headers.get(bitcode).ok_or_else(|| {
            PipelineError::DisassemblyFailed(format!("no fixture for {}", bitcode.display()))
        })?;
        fs::write(output, header)
            .map_err(|e| PipelineError::DisassemblyFailed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

fn write_manifest(dir: &Path, units: &[&Path]) -> PathBuf {
    let manifest = dir.join("MANIFEST.txt");
    let mut body = String::new();
    for unit in units {
        body.push_str(&unit.to_string_lossy());
        body.push('\n');
    }
    fs::write(&manifest, body).unwrap();
    manifest
}

fn header_for(source: &str) -> String {
    format!("; ModuleID = 'unit'\nsource_filename = \"{source}\"\n")
}

#[test]
fn absolute_declared_path_round_trips_unchanged() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let source = proj.join("src/main.c");
    touch(&source);
    let unit = proj.join("build/main.o.bc");
    touch(&unit);

    let fake = FakeDisassembler::default()
        .with_header(&unit, &header_for(&source.to_string_lossy()));
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&unit]);

    let sources = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();
    assert_eq!(sources, vec![source]);
}

#[test]
fn climbing_finds_source_in_ancestor_directory() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap().join("proj");
    let unit = proj.join("build/sub/unit.o.bc");
    touch(&unit);
    let source = proj.join("a/b.c");
    touch(&source);

    let fake = FakeDisassembler::default().with_header(&unit, &header_for("a/b.c"));
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&unit]);

    let sources = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();
    assert_eq!(sources, vec![source]);
}

#[test]
fn climbing_prefers_the_nearest_candidate() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap().join("proj");
    let unit = proj.join("build/sub/unit.o.bc");
    touch(&unit);
    // Both the unit's own directory and the project root hold a match; the
    // closer one must win.
    let near = proj.join("build/sub/a/b.c");
    touch(&near);
    touch(&proj.join("a/b.c"));

    let fake = FakeDisassembler::default().with_header(&unit, &header_for("a/b.c"));
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&unit]);

    let sources = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();
    assert_eq!(sources, vec![near]);
}

#[test]
fn climb_never_escapes_the_project_root() {
    let temp = tempdir().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let proj = root.join("proj");
    let unit = proj.join("build/unit.o.bc");
    touch(&unit);
    // The only match lives outside the project tree and must not be found.
    touch(&root.join("a/b.c"));

    let fake = FakeDisassembler::default().with_header(&unit, &header_for("a/b.c"));
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&unit]);

    let err = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap_err();
    assert!(matches!(err, PipelineError::SourceNotFound { .. }), "unexpected error: {err}");
}

#[test]
fn one_unresolvable_unit_fails_the_whole_batch() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let mut fake = FakeDisassembler::default();
    let mut units = Vec::new();
    for i in 0..3 {
        let source = proj.join(format!("src/file{i}.c"));
        touch(&source);
        let unit = proj.join(format!("build/file{i}.o.bc"));
        touch(&unit);
        fake = fake.with_header(&unit, &header_for(&source.to_string_lossy()));
        units.push(unit);
    }
    // Fourth unit's header has no source_filename declaration at all.
    let broken = proj.join("build/broken.o.bc");
    touch(&broken);
    fake = fake.with_header(&broken, "; ModuleID = 'broken'\n");
    units.push(broken.clone());

    let resolver = SourceResolver::new(&fake, &proj);
    let unit_refs: Vec<&Path> = units.iter().map(PathBuf::as_path).collect();
    let manifest = write_manifest(&proj, &unit_refs);

    let err = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap_err();
    match err {
        PipelineError::SourceFilenameMissing(unit) => assert_eq!(unit, broken),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_bitcode_entry_aborts_without_disassembly() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let bogus = proj.join("build/notes.txt");
    touch(&bogus);

    let fake = FakeDisassembler::default();
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&bogus]);

    let err = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap_err();
    assert!(matches!(err, PipelineError::ManifestCorrupt(_)), "unexpected error: {err}");
    assert_eq!(fake.call_count(), 0, "disassembly must not be attempted");
}

#[test]
fn missing_entry_aborts_without_disassembly() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let ghost = proj.join("build/ghost.o.bc");

    let fake = FakeDisassembler::default();
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&ghost]);

    let err = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap_err();
    assert!(matches!(err, PipelineError::ManifestCorrupt(_)), "unexpected error: {err}");
    assert_eq!(fake.call_count(), 0);
}

#[test]
fn blank_line_terminates_the_manifest_early() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let source = proj.join("src/only.c");
    touch(&source);
    let first = proj.join("build/only.o.bc");
    touch(&first);
    let after_blank = proj.join("build/ignored.o.bc");
    touch(&after_blank);

    let fake = FakeDisassembler::default()
        .with_header(&first, &header_for(&source.to_string_lossy()));
    let resolver = SourceResolver::new(&fake, &proj);

    let manifest = proj.join("MANIFEST.txt");
    fs::write(
        &manifest,
        format!("{}\n\n{}\n", first.display(), after_blank.display()),
    )
    .unwrap();

    let sources = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();
    assert_eq!(sources, vec![source]);
    assert_eq!(fake.call_count(), 1, "entries after the blank line must be ignored");
}

#[test]
fn declaration_outside_the_header_region_is_missed() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let source = proj.join("src/late.c");
    touch(&source);
    let unit = proj.join("build/late.o.bc");
    touch(&unit);

    // Declaration on line 5 sits past the scanned header region.
    let late_header = format!(
        ";1\n;2\n;3\n;4\nsource_filename = \"{}\"\n",
        source.display()
    );
    let fake = FakeDisassembler::default().with_header(&unit, &late_header);
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&unit]);

    let err = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap_err();
    assert!(matches!(err, PipelineError::SourceFilenameMissing(_)), "unexpected error: {err}");
}

#[test]
fn declaration_on_the_last_header_line_is_found() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let source = proj.join("src/edge.c");
    touch(&source);
    let unit = proj.join("build/edge.o.bc");
    touch(&unit);

    let header = format!(";1\n;2\n;3\nsource_filename = \"{}\"\n", source.display());
    let fake = FakeDisassembler::default().with_header(&unit, &header);
    let resolver = SourceResolver::new(&fake, &proj);
    let manifest = write_manifest(&proj, &[&unit]);

    let sources = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();
    assert_eq!(sources, vec![source]);
}

#[test]
fn empty_manifest_file_is_invalid_input() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let manifest = proj.join("MANIFEST.txt");
    fs::write(&manifest, "").unwrap();

    let fake = FakeDisassembler::default();
    let resolver = SourceResolver::new(&fake, &proj);

    let err = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap_err();
    assert!(matches!(err, PipelineError::InputInvalid(_)), "unexpected error: {err}");
}

#[test]
fn output_preserves_manifest_order_and_is_idempotent() {
    let temp = tempdir().unwrap();
    let proj = temp.path().canonicalize().unwrap();
    let mut fake = FakeDisassembler::default();
    let mut units = Vec::new();
    let mut expected = Vec::new();
    for name in ["zeta", "alpha", "mid"] {
        let source = proj.join(format!("src/{name}.c"));
        touch(&source);
        let unit = proj.join(format!("build/{name}.o.bc"));
        touch(&unit);
        fake = fake.with_header(&unit, &header_for(&source.to_string_lossy()));
        units.push(unit);
        expected.push(source);
    }

    let resolver = SourceResolver::new(&fake, &proj);
    let unit_refs: Vec<&Path> = units.iter().map(PathBuf::as_path).collect();
    let manifest = write_manifest(&proj, &unit_refs);

    let first = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();
    assert_eq!(first, expected, "manifest order must be preserved");

    let second = resolver.resolve_manifest(&manifest, &mut Transcript::new()).unwrap();

    let out_a = proj.join("a.txt");
    let out_b = proj.join("b.txt");
    write_source_list(&out_a, &first).unwrap();
    write_source_list(&out_b, &second).unwrap();
    assert_eq!(fs::read(&out_a).unwrap(), fs::read(&out_b).unwrap());
}

#[test]
fn climb_helper_is_bounded_and_nearest_first() {
    let temp = tempdir().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let proj = root.join("proj");
    fs::create_dir_all(proj.join("build/sub")).unwrap();
    touch(&proj.join("a/b.c"));

    let found =
        climb_for_source(&proj.join("build/sub"), Path::new("a/b.c"), &proj).unwrap();
    assert_eq!(found, proj.join("a/b.c"));

    // No match at all under the bound.
    assert!(climb_for_source(&proj.join("build/sub"), Path::new("x/y.c"), &proj).is_none());

    // Start directory outside the project root fails immediately.
    assert!(climb_for_source(&root, Path::new("a/b.c"), &proj).is_none());
}

#[test]
fn source_list_name_uses_project_basename() {
    assert_eq!(source_list_name(Path::new("/work/openssl")), "openssl_sources.txt");
    assert_eq!(source_list_name(Path::new("/work/openssl/")), "openssl_sources.txt");
}
