use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::ProtError;

pub const DEFAULT_CONFIG_FILE: &str = "protstruct.json";
pub const DEFAULT_BASE_URL: &str = "https://files.rcsb.org/download";
pub const DEFAULT_DSSP: &str = "mkdssp";
pub const DEFAULT_MIN_CHAIN_LEN: usize = 30;
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub pdb_dir: Option<String>,
    #[serde(default)]
    pub dssp_dir: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub dssp: Option<String>,
    #[serde(default)]
    pub dssp_args: Option<Vec<String>>,
    #[serde(default)]
    pub min_chain_len: Option<usize>,
    #[serde(default)]
    pub compressed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsspSettings {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub pdb_dir: Utf8PathBuf,
    pub dssp_dir: Utf8PathBuf,
    pub base_url: String,
    pub dssp: DsspSettings,
    pub min_chain_len: usize,
    pub compressed: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `protstruct.json` from the working directory when no
    /// path is given. A missing default file resolves to built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ProtError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| ProtError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| ProtError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, default_data_root()?)
    }

    pub fn resolve_config(
        config: Config,
        data_root: Utf8PathBuf,
    ) -> Result<ResolvedConfig, ProtError> {
        if let Some(version) = config.schema_version
            && version != SCHEMA_VERSION
        {
            return Err(ProtError::ConfigParse(format!(
                "unsupported schema_version {version}, expected {SCHEMA_VERSION}"
            )));
        }

        let pdb_dir = config
            .pdb_dir
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| data_root.join("pdb"));
        let dssp_dir = config
            .dssp_dir
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| data_root.join("dssp"));

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(ProtError::ConfigParse("base_url must not be empty".to_string()));
        }

        let program = config.dssp.unwrap_or_else(|| DEFAULT_DSSP.to_string());
        if program.trim().is_empty() {
            return Err(ProtError::ConfigParse("dssp must not be empty".to_string()));
        }

        Ok(ResolvedConfig {
            pdb_dir,
            dssp_dir,
            base_url,
            dssp: DsspSettings {
                program,
                args: config.dssp_args.unwrap_or_default(),
            },
            min_chain_len: config.min_chain_len.unwrap_or(DEFAULT_MIN_CHAIN_LEN),
            compressed: config.compressed.unwrap_or(false),
        })
    }
}

pub fn default_data_root() -> Result<Utf8PathBuf, ProtError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("protstruct")).ok()
        })
        .ok_or_else(|| ProtError::Filesystem("unable to resolve cache directory".to_string()))
}
