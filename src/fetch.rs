use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::StructureId;
use crate::error::ProtError;
use crate::rcsb::RcsbClient;
use crate::store::Store;

/// Resolves a structure id to a local file, downloading it on a cache miss.
pub trait StructureFetcher {
    fn fetch(&self, id: &StructureId, compressed: bool) -> Result<PathBuf, ProtError>;
}

#[derive(Clone)]
pub struct Fetcher<C: RcsbClient> {
    store: Store,
    client: C,
}

impl<C: RcsbClient> Fetcher<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }
}

impl<C: RcsbClient> StructureFetcher for Fetcher<C> {
    fn fetch(&self, id: &StructureId, compressed: bool) -> Result<PathBuf, ProtError> {
        self.store.ensure_pdb_dir()?;
        let path = self.store.structure_path(id, compressed);

        if Store::exists(&path) {
            debug!(structure_id = %id, path = %path, "structure already cached");
            return Ok(path.into_std_path_buf());
        }

        info!(structure_id = %id, compressed, "downloading structure");
        let temp = Store::temp_file_for(&path)?;
        self.client.download_structure(id, compressed, temp.path())?;
        Store::persist(temp, &path)?;
        Ok(path.into_std_path_buf())
    }
}
