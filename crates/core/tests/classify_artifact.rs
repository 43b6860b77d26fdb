use std::fs;

use bcprov_core::model::ExecutableType;
use bcprov_core::services::classify::classify_artifact;
use bcprov_core::PipelineError;
use tempfile::tempdir;

/// Minimal ELF header prefix: magic, padding out to the 16-byte ident
/// block, then the little-endian e_type field.
fn header_bytes(e_type: u16) -> Vec<u8> {
    let mut bytes = vec![0u8; 16];
    bytes[0] = 0x7f;
    bytes[1] = b'E';
    bytes[2] = b'L';
    bytes[3] = b'F';
    bytes.extend_from_slice(&e_type.to_le_bytes());
    // Trailing machine/version fields the classifier must ignore.
    bytes.extend_from_slice(&[0xAA; 8]);
    bytes
}

#[test]
fn executable_e_type_is_classified_as_executable() {
    let temp = tempdir().unwrap();
    let artifact = temp.path().join("app");
    fs::write(&artifact, header_bytes(2)).unwrap();

    let kind = classify_artifact(&artifact).unwrap();
    assert_eq!(kind, ExecutableType::Executable);
}

#[test]
fn dyn_e_type_is_classified_as_shared_object() {
    let temp = tempdir().unwrap();
    let artifact = temp.path().join("libapp.so");
    fs::write(&artifact, header_bytes(3)).unwrap();

    let kind = classify_artifact(&artifact).unwrap();
    assert_eq!(kind, ExecutableType::SharedObject);
}

#[test]
fn none_e_type_is_rejected() {
    let temp = tempdir().unwrap();
    let artifact = temp.path().join("none");
    fs::write(&artifact, header_bytes(0)).unwrap();

    let err = classify_artifact(&artifact).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)), "unexpected error: {err}");
}

#[test]
fn relocatable_and_core_e_types_are_rejected() {
    let temp = tempdir().unwrap();
    for e_type in [1u16, 4, 7, 0xFFFF] {
        let artifact = temp.path().join(format!("obj_{e_type}"));
        fs::write(&artifact, header_bytes(e_type)).unwrap();
        let err = classify_artifact(&artifact).unwrap_err();
        assert!(
            matches!(err, PipelineError::UnsupportedFormat(_)),
            "e_type {e_type} should be unsupported, got: {err}"
        );
    }
}

#[test]
fn truncated_header_is_rejected() {
    let temp = tempdir().unwrap();
    let artifact = temp.path().join("short");
    fs::write(&artifact, &header_bytes(2)[..10]).unwrap();

    let err = classify_artifact(&artifact).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat(_)), "unexpected error: {err}");
}

#[test]
fn missing_artifact_is_invalid_input() {
    let temp = tempdir().unwrap();
    let err = classify_artifact(&temp.path().join("absent")).unwrap_err();
    assert!(matches!(err, PipelineError::InputInvalid(_)), "unexpected error: {err}");
}

#[test]
fn directory_artifact_is_invalid_input() {
    let temp = tempdir().unwrap();
    let err = classify_artifact(temp.path()).unwrap_err();
    assert!(matches!(err, PipelineError::InputInvalid(_)), "unexpected error: {err}");
}
