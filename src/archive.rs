//! Zip-backed dataset archive.
//!
//! Every processed manifest entry becomes a group `<structure_id>/<chain_id>/`
//! holding `attrs.json` with the status flag. Successful groups also hold the
//! `AA` and `SS` strings and the `SA`, `Phi` and `Psi` arrays stored as
//! little-endian `f64`. `index.json` is written last, when the archive is
//! finished; an archive without it was not closed properly.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::{ChainDataset, ChainStatus, ManifestEntry};
use crate::error::{FailureKind, ProtError};

pub const INDEX_NAME: &str = "index.json";
const ATTRS_NAME: &str = "attrs.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAttrs {
    pub status: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub structure_id: String,
    pub chain_id: String,
    pub status: u8,
    pub residues: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub created_at: String,
    pub generator: String,
    pub min_chain_len: usize,
    pub groups: Vec<GroupSummary>,
}

pub struct ArchiveWriter {
    zip: ZipWriter<File>,
    min_chain_len: usize,
    groups: Vec<GroupSummary>,
    names: HashSet<String>,
}

impl ArchiveWriter {
    /// Creates (or truncates) the archive at `path`.
    pub fn create(path: &Path, min_chain_len: usize) -> Result<Self, ProtError> {
        let file = File::create(path).map_err(|err| ProtError::ArchiveCreate {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self {
            zip: ZipWriter::new(file),
            min_chain_len,
            groups: Vec::new(),
            names: HashSet::new(),
        })
    }

    pub fn write_group(
        &mut self,
        entry: &ManifestEntry,
        outcome: &Result<ChainDataset, FailureKind>,
    ) -> Result<(), ProtError> {
        let group = entry.group_name();
        if !self.names.insert(group.clone()) {
            return Err(ProtError::ArchiveWrite(format!("duplicate group {group}")));
        }

        self.zip
            .add_directory(format!("{group}/"), file_options())
            .map_err(write_error)?;

        let status = match outcome {
            Ok(_) => ChainStatus::Ok,
            Err(_) => ChainStatus::Failed,
        };
        let attrs = serde_json::to_vec(&GroupAttrs {
            status: status.code(),
        })
        .map_err(|err| ProtError::ArchiveWrite(err.to_string()))?;
        self.put(&format!("{group}/{ATTRS_NAME}"), &attrs)?;

        if let Ok(dataset) = outcome {
            self.put(&format!("{group}/AA"), dataset.aa_string().as_bytes())?;
            self.put(&format!("{group}/SS"), dataset.ss_string().as_bytes())?;
            self.put(&format!("{group}/SA"), &encode_floats(&dataset.sa()))?;
            self.put(&format!("{group}/Phi"), &encode_floats(&dataset.phi()))?;
            self.put(&format!("{group}/Psi"), &encode_floats(&dataset.psi()))?;
        }

        self.groups.push(GroupSummary {
            structure_id: entry.structure_id.to_string(),
            chain_id: entry.chain_id.to_string(),
            status: status.code(),
            residues: outcome.as_ref().map(ChainDataset::residue_count).unwrap_or(0),
            failure: outcome.as_ref().err().map(|kind| kind.to_string()),
        });
        Ok(())
    }

    /// Writes the index and the zip central directory.
    pub fn finish(mut self) -> Result<ArchiveIndex, ProtError> {
        let index = ArchiveIndex {
            created_at: Utc::now().to_rfc3339(),
            generator: format!("protstruct/{}", env!("CARGO_PKG_VERSION")),
            min_chain_len: self.min_chain_len,
            groups: std::mem::take(&mut self.groups),
        };
        let content = serde_json::to_vec_pretty(&index)
            .map_err(|err| ProtError::ArchiveWrite(err.to_string()))?;
        self.put(INDEX_NAME, &content)?;
        let mut file = self.zip.finish().map_err(write_error)?;
        file.flush()
            .map_err(|err| ProtError::ArchiveWrite(err.to_string()))?;
        Ok(index)
    }

    fn put(&mut self, name: &str, content: &[u8]) -> Result<(), ProtError> {
        self.zip
            .start_file(name, file_options())
            .map_err(write_error)?;
        self.zip
            .write_all(content)
            .map_err(|err| ProtError::ArchiveWrite(err.to_string()))
    }
}

/// Contents of one stored group. Residue data is absent for failed groups.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGroup {
    pub status: ChainStatus,
    pub aa: Option<String>,
    pub ss: Option<String>,
    pub sa: Option<Vec<f64>>,
    pub phi: Option<Vec<f64>>,
    pub psi: Option<Vec<f64>>,
}

pub struct ArchiveReader {
    zip: ZipArchive<File>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self, ProtError> {
        let file = File::open(path)
            .map_err(|err| ProtError::ArchiveRead(format!("open {}: {err}", path.display())))?;
        let zip = ZipArchive::new(file).map_err(|err| ProtError::ArchiveRead(err.to_string()))?;
        Ok(Self { zip })
    }

    pub fn index(&mut self) -> Result<ArchiveIndex, ProtError> {
        let content = self
            .read_entry(INDEX_NAME)?
            .ok_or_else(|| ProtError::ArchiveRead("archive has no index".to_string()))?;
        serde_json::from_slice(&content).map_err(|err| ProtError::ArchiveRead(err.to_string()))
    }

    /// `Ok(None)` when no group was written for this pair.
    pub fn group(
        &mut self,
        structure_id: &str,
        chain_id: &str,
    ) -> Result<Option<StoredGroup>, ProtError> {
        let prefix = format!("{structure_id}/{chain_id}");
        let Some(attrs) = self.read_entry(&format!("{prefix}/{ATTRS_NAME}"))? else {
            return Ok(None);
        };
        let attrs: GroupAttrs =
            serde_json::from_slice(&attrs).map_err(|err| ProtError::ArchiveRead(err.to_string()))?;
        let status = ChainStatus::from_code(attrs.status)
            .ok_or_else(|| ProtError::ArchiveRead(format!("invalid status {}", attrs.status)))?;

        Ok(Some(StoredGroup {
            status,
            aa: self.read_string(&format!("{prefix}/AA"))?,
            ss: self.read_string(&format!("{prefix}/SS"))?,
            sa: self.read_floats(&format!("{prefix}/SA"))?,
            phi: self.read_floats(&format!("{prefix}/Phi"))?,
            psi: self.read_floats(&format!("{prefix}/Psi"))?,
        }))
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, ProtError> {
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(ProtError::ArchiveRead(err.to_string())),
        };
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|err| ProtError::ArchiveRead(err.to_string()))?;
        Ok(Some(content))
    }

    fn read_string(&mut self, name: &str) -> Result<Option<String>, ProtError> {
        self.read_entry(name)?
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|err| ProtError::ArchiveRead(err.to_string()))
            })
            .transpose()
    }

    fn read_floats(&mut self, name: &str) -> Result<Option<Vec<f64>>, ProtError> {
        self.read_entry(name)?.map(|bytes| decode_floats(&bytes)).transpose()
    }
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn write_error(err: ZipError) -> ProtError {
    ProtError::ArchiveWrite(err.to_string())
}

fn encode_floats(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

fn decode_floats(bytes: &[u8]) -> Result<Vec<f64>, ProtError> {
    if bytes.len() % 8 != 0 {
        return Err(ProtError::ArchiveRead(format!(
            "float array has {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}
