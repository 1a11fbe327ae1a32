//! Structure file loading.
//!
//! Files may be plain or gzip-compressed PDB text. Parsing is delegated to
//! `pdbtbx`; the annotation step only needs the residue keys of the first model.

use std::collections::HashSet;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use pdbtbx::{Format, Model, PDB, PDBError, ReadOptions, StrictnessLevel};
use tracing::debug;

use crate::error::ProtError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decoded text of a structure file plus the label derived from its name.
#[derive(Debug, Clone)]
pub struct StructureFile {
    path: PathBuf,
    label: String,
    text: String,
    was_compressed: bool,
}

impl StructureFile {
    /// Reads `path`, inflating gzip content when the magic bytes are present.
    pub fn open(path: &Path) -> Result<Self, ProtError> {
        let bytes = fs::read(path).map_err(|err| parse_error(path, err.to_string()))?;
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, ProtError> {
        let was_compressed = bytes.starts_with(&GZIP_MAGIC);
        let bytes = if was_compressed {
            let mut decoded = Vec::new();
            GzDecoder::new(bytes.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|err| parse_error(path, format!("gzip: {err}")))?;
            decoded
        } else {
            bytes
        };
        let text = String::from_utf8(bytes)
            .map_err(|err| parse_error(path, format!("not UTF-8 text: {err}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            label: structure_label(path),
            text,
            was_compressed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn was_compressed(&self) -> bool {
        self.was_compressed
    }
}

/// File name up to the first `.`, or the whole name when there is none.
pub fn structure_label(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueKey {
    pub chain: char,
    pub seq: isize,
    pub icode: char,
}

/// Parses the decoded text as PDB. Loose strictness tolerates the header
/// irregularities common in deposited files; only breaking errors fail.
pub fn parse_structure(file: &StructureFile) -> Result<PDB, ProtError> {
    let (pdb, warnings) = ReadOptions::new()
        .set_format(Format::Pdb)
        .set_level(StrictnessLevel::Loose)
        .read_raw(BufReader::new(file.text().as_bytes()))
        .map_err(|errors| parse_error(file.path(), describe_errors(&errors)))?;

    if !warnings.is_empty() {
        debug!(
            label = file.label(),
            warnings = warnings.len(),
            "structure parsed with warnings"
        );
    }
    if pdb.atom_count() == 0 {
        return Err(parse_error(file.path(), "no ATOM or HETATM records".to_string()));
    }
    Ok(pdb)
}

pub fn first_model(pdb: &PDB) -> Option<&Model> {
    pdb.models().next()
}

/// Keys of every residue in `model`, hetero groups included.
pub fn residue_keys(model: &Model) -> HashSet<ResidueKey> {
    model
        .chains()
        .flat_map(|chain| {
            let chain_id = chain.id().chars().next().unwrap_or(' ');
            chain.residues().map(move |residue| ResidueKey {
                chain: chain_id,
                seq: residue.serial_number(),
                icode: residue
                    .insertion_code()
                    .and_then(|code| code.chars().next())
                    .unwrap_or(' '),
            })
        })
        .collect()
}

fn describe_errors(errors: &[PDBError]) -> String {
    if errors.is_empty() {
        return "unreadable structure".to_string();
    }
    errors
        .iter()
        .map(|err| err.short_description().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn parse_error(path: &Path, message: String) -> ProtError {
    ProtError::StructureParse {
        path: path.to_path_buf(),
        message,
    }
}
