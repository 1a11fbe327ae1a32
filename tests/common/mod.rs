#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;

use protstruct::config::DsspSettings;
use protstruct::domain::StructureId;
use protstruct::dssp::DsspAnnotator;
use protstruct::error::ProtError;
use protstruct::pdb::StructureFile;
use protstruct::rcsb::RcsbClient;
use protstruct::store::Store;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn temp_store(root: &Path) -> Store {
    let pdb_dir = Utf8PathBuf::from_path_buf(root.join("pdb")).unwrap();
    let dssp_dir = Utf8PathBuf::from_path_buf(root.join("dssp")).unwrap();
    Store::new_with_paths(pdb_dir, dssp_dir)
}

/// Annotator whose DSSP cache already holds the fixture output, with a tool
/// path that cannot be executed.
pub fn seeded_annotator(store: &Store) -> DsspAnnotator {
    let annotator = DsspAnnotator::new(
        store.clone(),
        DsspSettings {
            program: "/nonexistent/mkdssp".to_string(),
            args: Vec::new(),
        },
    );
    let file = StructureFile::open(&fixture("1tst.pdb")).unwrap();
    store.ensure_dssp_dir().unwrap();
    fs::copy(fixture("1tst.dssp"), annotator.cache_path(&file).as_std_path()).unwrap();
    annotator
}

/// Annotator that runs `body` with `sh` in place of mkdssp. The script gets
/// the input structure as `$1` and the output path as `$2`.
pub fn script_annotator(store: &Store, script_dir: &Path, name: &str, body: &str) -> DsspAnnotator {
    let script = script_dir.join(format!("{name}.sh"));
    fs::write(&script, body).unwrap();
    DsspAnnotator::new(
        store.clone(),
        DsspSettings {
            program: "sh".to_string(),
            args: vec![script.to_str().unwrap().to_string()],
        },
    )
}

/// Script that copies the fixture DSSP output, refusing input that is not
/// plain PDB text.
pub fn fixture_dssp_script() -> String {
    format!(
        "grep -q '^ATOM' \"$1\" || exit 1\ncat '{}' > \"$2\"\n",
        fixture("1tst.dssp").display()
    )
}

pub fn dssp_cache_entries(store: &Store) -> usize {
    fs::read_dir(store.dssp_dir().as_std_path())
        .map(|dir| dir.count())
        .unwrap_or(0)
}

#[derive(Default)]
pub struct MockRcsb {
    pub calls: Arc<Mutex<usize>>,
    pub body: Option<Vec<u8>>,
}

impl RcsbClient for MockRcsb {
    fn download_structure(
        &self,
        _id: &StructureId,
        _compressed: bool,
        destination: &Path,
    ) -> Result<(), ProtError> {
        *self.calls.lock().unwrap() += 1;
        match &self.body {
            Some(body) => {
                fs::write(destination, body).map_err(|err| ProtError::Filesystem(err.to_string()))
            }
            None => Err(ProtError::RcsbStatus {
                status: 404,
                message: "not found".to_string(),
            }),
        }
    }
}
