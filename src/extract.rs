use std::path::Path;

use tracing::debug;

use crate::domain::{ChainId, ResidueRecord};
use crate::dssp::StructureAnnotator;
use crate::error::ProtError;
use crate::pdb::{StructureFile, first_model, parse_structure};

/// Turns a structure file plus a chain id into that chain's residue records.
pub struct ChainExtractor<A: StructureAnnotator> {
    annotator: A,
}

impl<A: StructureAnnotator> ChainExtractor<A> {
    pub fn new(annotator: A) -> Self {
        Self { annotator }
    }

    /// Records of `chain_id` in annotator order. Chain ids match exactly,
    /// case included. An empty result is reported as `ChainNotFound`.
    pub fn extract_chain(
        &self,
        path: &Path,
        chain_id: ChainId,
    ) -> Result<Vec<ResidueRecord>, ProtError> {
        let file = StructureFile::open(path)?;
        let pdb = parse_structure(&file)?;
        let model = first_model(&pdb)
            .ok_or_else(|| ProtError::StructureParse {
                path: path.to_path_buf(),
                message: "structure has no models".to_string(),
            })?;

        let annotation = self.annotator.annotate(model, &file)?;
        let residues = annotation
            .into_iter()
            .filter(|(key, _)| key.chain == chain_id.as_char())
            .map(|(_, record)| record)
            .collect::<Vec<_>>();

        debug!(
            structure = file.label(),
            chain_id = %chain_id,
            residues = residues.len(),
            "extracted chain"
        );

        if residues.is_empty() {
            return Err(ProtError::ChainNotFound {
                structure: file.label().to_string(),
                chain: chain_id.to_string(),
            });
        }
        Ok(residues)
    }
}
