use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::archive::ArchiveWriter;
use crate::domain::{ChainDataset, ChainStatus, ManifestEntry, ResidueRecord};
use crate::dssp::StructureAnnotator;
use crate::error::{FailureKind, ProtError};
use crate::extract::ChainExtractor;
use crate::fetch::StructureFetcher;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub min_chain_len: usize,
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub structure_id: String,
    pub chain_id: String,
    pub status: ChainStatus,
    pub residues: usize,
    pub failure: Option<FailureKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub output: String,
    pub entries: Vec<EntryReport>,
    pub skipped_duplicates: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == ChainStatus::Ok)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Forwards progress events to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed_millis(elapsed), "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

fn elapsed_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Runs fetch and extraction for every manifest entry and stores one group per
/// entry. Entries are processed sequentially and own nothing but their result;
/// the archive writer is only touched from this loop.
pub struct BatchProcessor<F: StructureFetcher, A: StructureAnnotator> {
    fetcher: F,
    extractor: ChainExtractor<A>,
}

impl<F: StructureFetcher, A: StructureAnnotator> BatchProcessor<F, A> {
    pub fn new(fetcher: F, annotator: A) -> Self {
        Self {
            fetcher,
            extractor: ChainExtractor::new(annotator),
        }
    }

    /// Per-entry failures end up in the archive and the report; only archive
    /// errors abort the run. A partially written archive is left in place.
    pub fn process(
        &self,
        entries: &[ManifestEntry],
        output_path: &Path,
        options: &BatchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BatchReport, ProtError> {
        let mut writer = ArchiveWriter::create(output_path, options.min_chain_len)?;
        let (unique, skipped_duplicates) = dedup_entries(entries);
        let mut reports = Vec::with_capacity(unique.len());
        let started = Instant::now();

        for (index, entry) in unique.iter().copied().enumerate() {
            sink.event(ProgressEvent {
                message: format!("[{}/{}] {}", index + 1, unique.len(), entry),
                elapsed: Some(started.elapsed()),
            });

            let outcome = self
                .run_entry(entry, options.compressed)
                .and_then(|records| ChainDataset::new(records, options.min_chain_len));
            match &outcome {
                Ok(dataset) => info!(
                    structure_id = %entry.structure_id,
                    chain_id = %entry.chain_id,
                    residues = dataset.residue_count(),
                    "chain stored"
                ),
                Err(reason) => warn!(
                    structure_id = %entry.structure_id,
                    chain_id = %entry.chain_id,
                    reason = %reason,
                    "chain failed"
                ),
            }

            writer.write_group(entry, &outcome)?;
            reports.push(EntryReport {
                structure_id: entry.structure_id.to_string(),
                chain_id: entry.chain_id.to_string(),
                status: if outcome.is_ok() {
                    ChainStatus::Ok
                } else {
                    ChainStatus::Failed
                },
                residues: outcome.as_ref().map(ChainDataset::residue_count).unwrap_or(0),
                failure: outcome.err(),
            });
        }

        writer.finish()?;
        sink.event(ProgressEvent {
            message: format!("wrote {}", output_path.display()),
            elapsed: Some(started.elapsed()),
        });

        Ok(BatchReport {
            output: output_path.display().to_string(),
            entries: reports,
            skipped_duplicates,
        })
    }

    fn run_entry(
        &self,
        entry: &ManifestEntry,
        compressed: bool,
    ) -> Result<Vec<ResidueRecord>, FailureKind> {
        let path = self
            .fetcher
            .fetch(&entry.structure_id, compressed)
            .map_err(|err| FailureKind::Fetch {
                message: err.to_string(),
            })?;
        self.extractor
            .extract_chain(&path, entry.chain_id)
            .map_err(FailureKind::from)
    }
}

/// First occurrence of each entry, in manifest order, plus the number dropped.
fn dedup_entries(entries: &[ManifestEntry]) -> (Vec<&ManifestEntry>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(entries.len());
    for entry in entries {
        if seen.insert(entry) {
            unique.push(entry);
        } else {
            warn!(entry = %entry, "duplicate manifest entry skipped");
        }
    }
    let skipped = entries.len() - unique.len();
    (unique, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;

    #[test]
    fn duplicates_keep_first_occurrence_order() {
        let entries = parse_manifest("1TSTA\n1TSTB\n1TSTA\n2BADA\n1TSTB\n");
        let (unique, skipped) = dedup_entries(&entries);
        let names = unique.iter().map(|entry| entry.to_string()).collect::<Vec<_>>();
        assert_eq!(names, ["1TSTA", "1TSTB", "2BADA"]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn elapsed_millis_saturates() {
        assert_eq!(elapsed_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(elapsed_millis(Duration::MAX), u64::MAX);
    }
}
