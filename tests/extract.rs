mod common;

use std::fs;
use std::io::Write;

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;

use protstruct::error::ProtError;
use protstruct::extract::ChainExtractor;

use common::{
    dssp_cache_entries, fixture, fixture_dssp_script, script_annotator, seeded_annotator,
    temp_store,
};

#[test]
fn extracts_fixture_chain() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let extractor = ChainExtractor::new(seeded_annotator(&store));

    let residues = extractor
        .extract_chain(&fixture("1tst.pdb"), "A".parse().unwrap())
        .unwrap();
    assert_eq!(residues.len(), 12);

    let aa = residues.iter().map(|res| res.aa).collect::<String>();
    let ss = residues.iter().map(|res| res.ss).collect::<String>();
    assert_eq!(aa, "MKVLAGHEEFST");
    assert_eq!(ss, "-HHHHHTT-EE-");

    let residue = residues[8];
    assert_eq!(residue.aa, 'E');
    assert!((residue.sa - 20.0 / 194.0).abs() <= 1e-2 * (20.0 / 194.0));
    assert_eq!(residue.phi, -113.0);
    assert_eq!(residue.psi, 137.0);

    let residue = residues[9];
    assert_eq!(residue.aa, 'F');
    assert_eq!(residue.ss, 'E');
    assert!((residue.sa - 7.0 / 197.0).abs() <= 1e-2 * (7.0 / 197.0));
    assert_eq!(residue.phi, -120.2);
    assert_eq!(residue.psi, 130.5);
}

#[test]
fn bridged_cysteines_are_reported_as_cys() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let extractor = ChainExtractor::new(seeded_annotator(&store));

    let residues = extractor
        .extract_chain(&fixture("1tst.pdb"), "B".parse().unwrap())
        .unwrap();
    let aa = residues.iter().map(|res| res.aa).collect::<String>();
    assert_eq!(aa, "CWD");
}

#[test]
fn chain_ids_are_case_sensitive() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let extractor = ChainExtractor::new(seeded_annotator(&store));

    let err = extractor
        .extract_chain(&fixture("1tst.pdb"), "a".parse().unwrap())
        .unwrap_err();
    assert_matches!(err, ProtError::ChainNotFound { .. });
}

#[test]
fn reads_gzip_compressed_structures() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let extractor = ChainExtractor::new(seeded_annotator(&store));

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&fs::read(fixture("1tst.pdb")).unwrap())
        .unwrap();
    let path = temp.path().join("1tst.pdb.gz");
    fs::write(&path, encoder.finish().unwrap()).unwrap();

    let residues = extractor
        .extract_chain(&path, "A".parse().unwrap())
        .unwrap();
    assert_eq!(residues.len(), 12);
}

#[test]
fn unparsable_structure_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let extractor = ChainExtractor::new(seeded_annotator(&store));

    let path = temp.path().join("1tst.pdb");
    fs::write(&path, "<html>404 Not Found</html>\n").unwrap();

    let err = extractor
        .extract_chain(&path, "A".parse().unwrap())
        .unwrap_err();
    assert_matches!(err, ProtError::StructureParse { .. });
}

#[test]
fn missing_dssp_tool_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    // no cached output for this label, so the tool would have to run
    let annotator = seeded_annotator(&store);
    let path = temp.path().join("2tst.pdb");
    fs::copy(fixture("1tst.pdb"), &path).unwrap();

    let err = ChainExtractor::new(annotator)
        .extract_chain(&path, "A".parse().unwrap())
        .unwrap_err();
    assert_matches!(err, ProtError::MissingTool(tool) if tool == "/nonexistent/mkdssp");
}

#[cfg(unix)]
#[test]
fn same_file_name_with_different_content_is_annotated_again() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());

    let first = temp.path().join("a").join("model.pdb");
    fs::create_dir_all(first.parent().unwrap()).unwrap();
    fs::copy(fixture("1tst.pdb"), &first).unwrap();
    let extractor = ChainExtractor::new(script_annotator(
        &store,
        temp.path(),
        "fixture",
        &fixture_dssp_script(),
    ));
    let residues = extractor
        .extract_chain(&first, "A".parse().unwrap())
        .unwrap();
    assert_eq!(residues.len(), 12);

    let second = temp.path().join("b").join("model.pdb");
    fs::create_dir_all(second.parent().unwrap()).unwrap();
    let text = fs::read_to_string(fixture("1tst.pdb"))
        .unwrap()
        .replace("MET A", "GLY A");
    fs::write(&second, text).unwrap();
    let extractor = ChainExtractor::new(script_annotator(
        &store,
        temp.path(),
        "garbage",
        "echo garbage > \"$2\"\n",
    ));
    let err = extractor
        .extract_chain(&second, "A".parse().unwrap())
        .unwrap_err();
    assert_matches!(err, ProtError::DsspParse(_));

    // the first file is still served from its own entry
    let residues = extractor
        .extract_chain(&first, "A".parse().unwrap())
        .unwrap();
    assert_eq!(residues.len(), 12);
}

#[cfg(unix)]
#[test]
fn unparsable_dssp_output_is_not_cached() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let path = fixture("1tst.pdb");

    let broken = ChainExtractor::new(script_annotator(
        &store,
        temp.path(),
        "mmcif",
        "echo data_1TST > \"$2\"\n",
    ));
    let err = broken
        .extract_chain(&path, "A".parse().unwrap())
        .unwrap_err();
    assert_matches!(err, ProtError::DsspParse(_));
    assert_eq!(dssp_cache_entries(&store), 0);

    let fixed = ChainExtractor::new(script_annotator(
        &store,
        temp.path(),
        "fixture",
        &fixture_dssp_script(),
    ));
    let residues = fixed.extract_chain(&path, "A".parse().unwrap()).unwrap();
    assert_eq!(residues.len(), 12);
    assert_eq!(dssp_cache_entries(&store), 1);
}

#[cfg(unix)]
#[test]
fn failing_tool_reports_annotator_error() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(temp.path());
    let extractor = ChainExtractor::new(script_annotator(
        &store,
        temp.path(),
        "failing",
        "echo 'cannot open input' >&2\nexit 2\n",
    ));

    let err = extractor
        .extract_chain(&fixture("1tst.pdb"), "A".parse().unwrap())
        .unwrap_err();
    assert_matches!(err, ProtError::Annotator(message) if message == "cannot open input");
    assert_eq!(dssp_cache_entries(&store), 0);
}
