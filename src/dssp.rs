//! DSSP-backed structural annotation.
//!
//! `mkdssp` is treated as an oracle: it is run once per structure file and its
//! classic-format output is parsed into per-residue records. Output that parsed
//! is cached under the file's label plus a digest of its decoded text.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8PathBuf;
use pdbtbx::Model;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::DsspSettings;
use crate::domain::ResidueRecord;
use crate::error::ProtError;
use crate::pdb::{ResidueKey, StructureFile, residue_keys};
use crate::store::Store;

/// Annotator output in the order the oracle reported it.
pub type Annotation = Vec<(ResidueKey, ResidueRecord)>;

pub trait StructureAnnotator {
    fn annotate(&self, model: &Model, file: &StructureFile) -> Result<Annotation, ProtError>;
}

/// One data row of a classic DSSP file, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct DsspRow {
    pub key: ResidueKey,
    pub aa: char,
    pub ss: char,
    pub acc: f64,
    pub phi: f64,
    pub psi: f64,
}

#[derive(Clone)]
pub struct DsspAnnotator {
    store: Store,
    settings: DsspSettings,
}

impl DsspAnnotator {
    pub fn new(store: Store, settings: DsspSettings) -> Self {
        Self { store, settings }
    }

    /// Cache entry for `file`. Files sharing a name but not content never
    /// share an entry.
    pub fn cache_path(&self, file: &StructureFile) -> Utf8PathBuf {
        let digest = format!("{:x}", Sha256::digest(file.text().as_bytes()));
        self.store
            .dssp_path(&format!("{}-{}", file.label(), &digest[..32]))
    }

    fn dssp_rows(&self, file: &StructureFile) -> Result<Vec<DsspRow>, ProtError> {
        let cached = self.cache_path(file);
        if Store::exists(&cached) {
            debug!(label = file.label(), path = %cached, "using cached DSSP output");
            let text = fs::read_to_string(cached.as_std_path())
                .map_err(|err| ProtError::Filesystem(err.to_string()))?;
            return parse_dssp(&text);
        }

        self.store.ensure_dssp_dir()?;
        let program = resolve_program(&self.settings.program)
            .ok_or_else(|| ProtError::MissingTool(self.settings.program.clone()))?;

        // mkdssp cannot read gzip input, so hand it the decoded text
        let plain_input = if file.was_compressed() {
            let mut temp = tempfile::Builder::new()
                .prefix("protstruct-")
                .suffix(".pdb")
                .tempfile()
                .map_err(|err| ProtError::Filesystem(err.to_string()))?;
            temp.write_all(file.text().as_bytes())
                .map_err(|err| ProtError::Filesystem(err.to_string()))?;
            Some(temp)
        } else {
            None
        };
        let input = plain_input
            .as_ref()
            .map(|temp| temp.path())
            .unwrap_or_else(|| file.path());

        let output = Store::temp_file_for(&cached)?;
        info!(label = file.label(), program = %program.display(), "running DSSP");
        run_dssp(&program, &self.settings.args, input, output.path())?;

        let text = fs::read_to_string(output.path())
            .map_err(|err| ProtError::Annotator(format!("unreadable DSSP output: {err}")))?;
        // the temp file is dropped unpersisted when parsing fails
        let rows = parse_dssp(&text)?;
        Store::persist(output, &cached)?;
        Ok(rows)
    }
}

impl StructureAnnotator for DsspAnnotator {
    fn annotate(&self, model: &Model, file: &StructureFile) -> Result<Annotation, ProtError> {
        let rows = self.dssp_rows(file)?;
        Ok(annotation_from_rows(model, rows))
    }
}

/// Keeps rows that belong to residues of `model` and normalizes accessibility.
pub fn annotation_from_rows(model: &Model, rows: Vec<DsspRow>) -> Annotation {
    let known = residue_keys(model);
    rows.into_iter()
        .filter(|row| known.contains(&row.key))
        .map(|row| {
            let record = ResidueRecord {
                aa: row.aa,
                ss: row.ss,
                sa: relative_accessibility(row.aa, row.acc),
                phi: row.phi,
                psi: row.psi,
            };
            (row.key, record)
        })
        .collect()
}

fn run_dssp(program: &Path, extra_args: &[String], input: &Path, output: &Path) -> Result<(), ProtError> {
    let result = Command::new(program)
        .args(extra_args)
        .arg(input)
        .arg(output)
        .output()
        .map_err(|err| ProtError::Annotator(err.to_string()))?;
    if result.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("command failed: {}", program.display())
    } else {
        stderr
    };
    Err(ProtError::Annotator(message))
}

fn resolve_program(program: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(program);
    if direct.components().count() > 1 {
        return direct.is_file().then_some(direct);
    }
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let exe = dir.join(format!("{program}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = dir.join(program);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}

const HEADER_PREFIX: &str = "  #  RESIDUE";

/// Parses the residue table of classic DSSP output.
pub fn parse_dssp(text: &str) -> Result<Vec<DsspRow>, ProtError> {
    let mut lines = text.lines().enumerate();
    if !lines.any(|(_, line)| line.starts_with(HEADER_PREFIX)) {
        return Err(ProtError::DsspParse("missing residue table header".to_string()));
    }

    let mut rows = Vec::new();
    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(row) = parse_row(line).map_err(|message| {
            ProtError::DsspParse(format!("line {}: {message}", index + 1))
        })? {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Result<Option<DsspRow>, String> {
    let column = |start: usize, end: usize| {
        line.get(start..end)
            .ok_or_else(|| format!("row too short for columns {start}..{end}"))
    };
    let char_at = |pos: usize| column(pos, pos + 1).map(|value| value.chars().next().unwrap_or(' '));

    // chain break rows carry '!' and no residue number
    let aa = char_at(13)?;
    if aa == '!' || column(5, 10)?.trim().is_empty() {
        return Ok(None);
    }

    let seq = column(5, 10)?
        .trim()
        .parse::<isize>()
        .map_err(|_| "invalid residue number".to_string())?;
    let icode = char_at(10)?;
    let chain = char_at(11)?;
    let ss = match char_at(16)? {
        ' ' => '-',
        other => other,
    };
    let acc = parse_float(column(34, 38)?, "accessibility")?;
    let phi = parse_float(column(103, 109)?, "phi")?;
    let psi = parse_float(column(109, 115)?, "psi")?;

    Ok(Some(DsspRow {
        key: ResidueKey { chain, seq, icode },
        aa: if aa.is_ascii_lowercase() { 'C' } else { aa },
        ss,
        acc,
        phi,
        psi,
    }))
}

fn parse_float(value: &str, what: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid {what} {value:?}"))
}

/// Maximum accessible surface area per residue type (Sander & Rost 1994).
pub fn max_accessibility(aa: char) -> Option<f64> {
    let value = match aa {
        'A' => 106.0,
        'R' => 248.0,
        'N' => 157.0,
        'D' => 163.0,
        'C' => 135.0,
        'Q' => 198.0,
        'E' => 194.0,
        'G' => 84.0,
        'H' => 184.0,
        'I' => 169.0,
        'L' => 164.0,
        'K' => 205.0,
        'M' => 188.0,
        'F' => 197.0,
        'P' => 136.0,
        'S' => 130.0,
        'T' => 142.0,
        'W' => 227.0,
        'Y' => 222.0,
        'V' => 142.0,
        _ => return None,
    };
    Some(value)
}

/// Absolute accessibility divided by the residue's maximum; NaN for unknown types.
pub fn relative_accessibility(aa: char, acc: f64) -> f64 {
    max_accessibility(aa)
        .map(|max| acc / max)
        .unwrap_or(f64::NAN)
}
