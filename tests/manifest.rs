use std::fs;

use assert_matches::assert_matches;

use protstruct::error::ProtError;
use protstruct::manifest::build_manifest;

#[test]
fn builds_entries_in_file_order() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("minicullpdb");
    fs::write(&path, "12ASA\n16VPA\n1A0IA\n").unwrap();

    let entries = build_manifest(&path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].structure_id.as_str(), "12AS");
    assert_eq!(entries[0].chain_id.as_char(), 'A');
    assert_eq!(entries[1].structure_id.as_str(), "16VP");
    assert_eq!(entries[2].structure_id.as_str(), "1A0I");
}

#[test]
fn skips_malformed_lines_without_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("manifest.txt");
    fs::write(&path, "12asb\n\n123A\n12AS7\n1*2SA\n12ASAA\n").unwrap();

    let entries = build_manifest(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].structure_id.as_str(), "12as");
    assert_eq!(entries[0].chain_id.as_char(), 'b');
}

#[test]
fn missing_manifest_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = build_manifest(&temp.path().join("absent")).unwrap_err();
    assert_matches!(err, ProtError::ManifestRead { .. });
}
