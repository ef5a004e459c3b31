use std::collections::HashMap;

use camino::Utf8Path;
use tracing::{debug, info};

use crate::domain::{Catalog, ResolutionLadder, bin_count};
use crate::error::ConvertError;
use crate::store::{ArraySpec, ZarrArray, ZarrStore};

pub const CHROMOSOMES_GROUP: &str = "chromosomes";

/// Store path of the array for `chrom` at `resolution`.
pub fn array_path(chrom: &str, resolution: u64) -> String {
    format!("{CHROMOSOMES_GROUP}/{chrom}/{resolution}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageOptions {
    pub chunk_width: u64,
    pub compression_level: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            chunk_width: 65_536,
            compression_level: 1,
        }
    }
}

/// Array handles of a freshly built store, keyed by `(chromosome, resolution)`.
#[derive(Debug)]
pub struct StoreLayout {
    store: ZarrStore,
    arrays: HashMap<(String, u64), ZarrArray>,
}

impl StoreLayout {
    /// Allocates one `(num_samples, ceil(length / resolution))` NaN-filled
    /// array per catalog chromosome and ladder level under a fresh store.
    pub fn build(
        root: &Utf8Path,
        catalog: &Catalog,
        ladder: &ResolutionLadder,
        num_samples: usize,
        options: StorageOptions,
    ) -> Result<Self, ConvertError> {
        let store = ZarrStore::create(root)?;
        store.create_group(CHROMOSOMES_GROUP)?;

        let mut arrays = HashMap::with_capacity(catalog.len() * ladder.levels().len());
        for chrom in catalog.chromosomes() {
            store.create_group(&format!("{CHROMOSOMES_GROUP}/{}", chrom.name))?;
            for &resolution in ladder.levels() {
                let spec = ArraySpec {
                    rows: num_samples as u64,
                    width: bin_count(chrom.length, resolution),
                    chunk_width: options.chunk_width,
                    compression_level: options.compression_level,
                };
                let array = store.create_array(&array_path(&chrom.name, resolution), spec)?;
                debug!(array = array.path(), width = spec.width, "allocated array");
                arrays.insert((chrom.name.clone(), resolution), array);
            }
        }
        info!(
            root = %root,
            chromosomes = catalog.len(),
            resolutions = ladder.levels().len(),
            samples = num_samples,
            "store layout created"
        );
        Ok(Self { store, arrays })
    }

    pub fn store(&self) -> &ZarrStore {
        &self.store
    }

    pub fn array(&self, chrom: &str, resolution: u64) -> Option<&ZarrArray> {
        self.arrays.get(&(chrom.to_string(), resolution))
    }

    pub fn array_count(&self) -> usize {
        self.arrays.len()
    }
}
