//! Manifest parsing: one `<structure_id><chain_id>` record per line.
//!
//! Records that do not have the expected shape are dropped, not reported.
//! Identifiers are passed through without case normalization.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::ManifestEntry;
use crate::error::ProtError;

fn record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<id>[A-Za-z0-9]{4})(?P<chain>[A-Za-z])$").expect("valid manifest regex")
    })
}

pub fn build_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ProtError> {
    let content = fs::read_to_string(path).map_err(|err| ProtError::ManifestRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(parse_manifest(&content))
}

pub fn parse_manifest(content: &str) -> Vec<ManifestEntry> {
    content.lines().filter_map(parse_record).collect()
}

fn parse_record(line: &str) -> Option<ManifestEntry> {
    let captures = record_pattern().captures(line.trim())?;
    let structure_id = captures.name("id")?.as_str().parse().ok()?;
    let chain_id = captures.name("chain")?.as_str().parse().ok()?;
    Some(ManifestEntry::new(structure_id, chain_id))
}
