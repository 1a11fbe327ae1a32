use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::{Builder, NamedTempFile};

use crate::config::ResolvedConfig;
use crate::domain::StructureId;
use crate::error::ProtError;

/// On-disk cache of downloaded structures and annotator output.
#[derive(Debug, Clone)]
pub struct Store {
    pdb_dir: Utf8PathBuf,
    dssp_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self::new_with_paths(config.pdb_dir.clone(), config.dssp_dir.clone())
    }

    pub fn new_with_paths(pdb_dir: Utf8PathBuf, dssp_dir: Utf8PathBuf) -> Self {
        Self { pdb_dir, dssp_dir }
    }

    pub fn pdb_dir(&self) -> &Utf8Path {
        &self.pdb_dir
    }

    pub fn dssp_dir(&self) -> &Utf8Path {
        &self.dssp_dir
    }

    pub fn structure_path(&self, id: &StructureId, compressed: bool) -> Utf8PathBuf {
        self.pdb_dir.join(structure_file_name(id, compressed))
    }

    pub fn dssp_path(&self, id: &str) -> Utf8PathBuf {
        self.dssp_dir.join(format!("{}.dssp", id.to_ascii_lowercase()))
    }

    pub fn ensure_pdb_dir(&self) -> Result<(), ProtError> {
        fs::create_dir_all(self.pdb_dir.as_std_path())
            .map_err(|err| ProtError::Filesystem(err.to_string()))
    }

    pub fn ensure_dssp_dir(&self) -> Result<(), ProtError> {
        fs::create_dir_all(self.dssp_dir.as_std_path())
            .map_err(|err| ProtError::Filesystem(err.to_string()))
    }

    pub fn exists(path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }

    /// Temp file next to `dest`, to be filled and then handed to [`Store::persist`].
    pub fn temp_file_for(dest: &Utf8Path) -> Result<NamedTempFile, ProtError> {
        let parent = dest
            .parent()
            .ok_or_else(|| ProtError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ProtError::Filesystem(err.to_string()))?;
        Builder::new()
            .prefix("protstruct-")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| ProtError::Filesystem(err.to_string()))
    }

    pub fn persist(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), ProtError> {
        temp.persist(dest.as_std_path())
            .map_err(|err| ProtError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

pub fn structure_file_name(id: &StructureId, compressed: bool) -> String {
    if compressed {
        format!("{}.pdb.gz", id.file_stem())
    } else {
        format!("{}.pdb", id.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_paths(
            Utf8PathBuf::from("/cache/pdb"),
            Utf8PathBuf::from("/cache/dssp"),
        );
        let id: StructureId = "12AS".parse().unwrap();

        assert!(store.structure_path(&id, false).ends_with("pdb/12as.pdb"));
        assert!(store.structure_path(&id, true).ends_with("pdb/12as.pdb.gz"));
        assert!(store.dssp_path("12AS").ends_with("dssp/12as.dssp"));
    }

    #[test]
    fn persisted_temp_file_replaces_destination() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("nested").join("file.txt")).unwrap();

        for content in ["first", "second"] {
            let mut file = Store::temp_file_for(&path).unwrap();
            file.write_all(content.as_bytes()).unwrap();
            Store::persist(file, &path).unwrap();
        }

        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "second");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
