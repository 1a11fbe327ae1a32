use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ProtError {
    #[error("invalid structure id: {0}")]
    InvalidStructureId(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read manifest {path}: {message}")]
    ManifestRead { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("RCSB request failed: {0}")]
    RcsbHttp(String),

    #[error("RCSB returned status {status}: {message}")]
    RcsbStatus { status: u16, message: String },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("structure annotation failed: {0}")]
    Annotator(String),

    #[error("failed to parse structure {path}: {message}")]
    StructureParse { path: PathBuf, message: String },

    #[error("failed to parse DSSP output: {0}")]
    DsspParse(String),

    #[error("chain {chain} not found in {structure}")]
    ChainNotFound { structure: String, chain: String },

    #[error("failed to create archive {path}: {message}")]
    ArchiveCreate { path: PathBuf, message: String },

    #[error("failed to write archive: {0}")]
    ArchiveWrite(String),

    #[error("failed to read archive: {0}")]
    ArchiveRead(String),
}

/// Why a single manifest entry ended up with `status = 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    Fetch { message: String },
    Parse { message: String },
    Annotate { message: String },
    ChainNotFound,
    TooShort { residues: usize, min: usize },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Fetch { message } => write!(f, "fetch failed: {message}"),
            FailureKind::Parse { message } => write!(f, "parse failed: {message}"),
            FailureKind::Annotate { message } => write!(f, "annotation failed: {message}"),
            FailureKind::ChainNotFound => write!(f, "chain not found"),
            FailureKind::TooShort { residues, min } => {
                write!(f, "chain too short ({residues} < {min})")
            }
        }
    }
}

impl From<ProtError> for FailureKind {
    fn from(error: ProtError) -> Self {
        match error {
            ProtError::ChainNotFound { .. } => FailureKind::ChainNotFound,
            ProtError::RcsbHttp(_) | ProtError::RcsbStatus { .. } => FailureKind::Fetch {
                message: error.to_string(),
            },
            ProtError::StructureParse { .. } | ProtError::DsspParse(_) => FailureKind::Parse {
                message: error.to_string(),
            },
            other => FailureKind::Annotate {
                message: other.to_string(),
            },
        }
    }
}
