use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, ProtError};

/// Four-character PDB entry identifier, kept exactly as read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureId(String);

impl StructureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used for cache file names and download URLs.
    pub fn file_stem(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StructureId {
    type Err = ProtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = trimmed.len() == 4 && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(ProtError::InvalidStructureId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(char);

impl ChainId {
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = ProtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphabetic() => Ok(Self(ch)),
            _ => Err(ProtError::InvalidChainId(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManifestEntry {
    pub structure_id: StructureId,
    pub chain_id: ChainId,
}

impl ManifestEntry {
    pub fn new(structure_id: StructureId, chain_id: ChainId) -> Self {
        Self {
            structure_id,
            chain_id,
        }
    }

    /// Archive group path, `<structure_id>/<chain_id>`.
    pub fn group_name(&self) -> String {
        format!("{}/{}", self.structure_id, self.chain_id)
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.structure_id, self.chain_id)
    }
}

/// Per-residue annotation: amino acid, secondary structure, relative solvent
/// accessibility and backbone dihedrals in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResidueRecord {
    pub aa: char,
    pub ss: char,
    pub sa: f64,
    pub phi: f64,
    pub psi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStatus {
    Failed,
    Ok,
}

impl ChainStatus {
    pub fn code(self) -> u8 {
        match self {
            ChainStatus::Failed => 0,
            ChainStatus::Ok => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ChainStatus::Failed),
            1 => Some(ChainStatus::Ok),
            _ => None,
        }
    }
}

/// Residues of one chain that passed the minimum length policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDataset {
    residues: Vec<ResidueRecord>,
}

impl ChainDataset {
    pub fn new(residues: Vec<ResidueRecord>, min_chain_len: usize) -> Result<Self, FailureKind> {
        if residues.len() < min_chain_len {
            return Err(FailureKind::TooShort {
                residues: residues.len(),
                min: min_chain_len,
            });
        }
        Ok(Self { residues })
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn aa_string(&self) -> String {
        self.residues.iter().map(|res| res.aa).collect()
    }

    pub fn ss_string(&self) -> String {
        self.residues.iter().map(|res| res.ss).collect()
    }

    pub fn sa(&self) -> Vec<f64> {
        self.residues.iter().map(|res| res.sa).collect()
    }

    pub fn phi(&self) -> Vec<f64> {
        self.residues.iter().map(|res| res.phi).collect()
    }

    pub fn psi(&self) -> Vec<f64> {
        self.residues.iter().map(|res| res.psi).collect()
    }
}
