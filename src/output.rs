use std::io::{self, Write};

use serde::Serialize;

use crate::archive::ArchiveIndex;
use crate::batch::{BatchReport, ProgressEvent, ProgressSink};
use crate::domain::{ManifestEntry, ResidueRecord};

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub structure_id: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResult {
    pub path: String,
    pub chain_id: String,
    pub residues: Vec<ResidueRecord>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_manifest(entries: &[ManifestEntry]) -> io::Result<()> {
        Self::print_json(&entries)
    }

    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_extract(result: &ExtractResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_report(report: &BatchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_index(index: &ArchiveIndex) -> io::Result<()> {
        Self::print_json(index)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
