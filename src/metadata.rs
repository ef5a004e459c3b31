use std::fs;
use std::io;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SampleInput;
use crate::domain::{Catalog, ResolutionLadder};
use crate::error::ConvertError;
use crate::layout::array_path;
use crate::row_info::{RowInfo, RowInfoTransform};

pub const TILE_SIZE: u64 = 256;
pub const MULTISCALES_VERSION: &str = "0.1";
pub const MULTISCALES_TYPE: &str = "zarr-multivec";

/// Assembly implied by a dataset name such as `Homo_sapiens__CTCF__all`.
pub fn coord_system_for_name(name: &str) -> Option<&'static str> {
    let species = name.split("__").next()?.replace(' ', "_");
    match species.as_str() {
        "Homo_sapiens" => Some("hg38"),
        "Mus_musculus" => Some("mm10"),
        _ => None,
    }
}

/// Reads and normalizes every sample's descriptor, in sample order.
/// Any unreadable or malformed file fails the whole batch.
pub fn load_row_infos(
    samples: &[SampleInput],
    transform: &dyn RowInfoTransform,
) -> Result<Vec<RowInfo>, ConvertError> {
    samples
        .iter()
        .map(|sample| {
            let path = sample.metadata.to_string();
            let malformed = |message: String| ConvertError::MetadataMalformed {
                sample: sample.index,
                path: path.clone(),
                message,
            };
            let content = fs::read_to_string(sample.metadata.as_std_path()).map_err(|err| {
                match err.kind() {
                    io::ErrorKind::NotFound => ConvertError::MetadataMissing {
                        sample: sample.index,
                        path: path.clone(),
                    },
                    _ => malformed(err.to_string()),
                }
            })?;
            let raw: serde_json::Value =
                serde_json::from_str(&content).map_err(|err| malformed(err.to_string()))?;
            let info = transform
                .normalize(&raw)
                .map_err(|err| malformed(err.to_string()))?;
            debug!(sample = %sample.id, fields = info.len(), "normalized row info");
            Ok(info)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromMetadata {
    pub chromsize: u64,
}

/// Pyramid descriptor for one chromosome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiscale {
    pub version: String,
    pub name: String,
    pub datasets: Vec<Dataset>,
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: ChromMetadata,
}

/// Root attributes; a superset of the tileset info a tile server would
/// report, so clients can read the store directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreAttributes {
    pub row_infos: Vec<RowInfo>,
    pub tile_size: u64,
    pub resolutions: Vec<u64>,
    pub min_pos: Vec<u64>,
    pub max_pos: Vec<u64>,
    pub shape: Vec<u64>,
    pub name: String,
    #[serde(rename = "coordSystem")]
    pub coord_system: String,
    #[serde(rename = "chromSizes")]
    pub chrom_sizes: Vec<(String, u64)>,
    pub multiscales: Vec<Multiscale>,
}

impl StoreAttributes {
    pub fn assemble(
        catalog: &Catalog,
        ladder: &ResolutionLadder,
        name: &str,
        row_infos: Vec<RowInfo>,
    ) -> Self {
        let resolutions = ladder.descending();
        let num_samples = row_infos.len() as u64;
        let multiscales = catalog
            .chromosomes()
            .iter()
            .map(|chrom| Multiscale {
                version: MULTISCALES_VERSION.to_string(),
                name: chrom.name.clone(),
                datasets: resolutions
                    .iter()
                    .map(|&resolution| Dataset {
                        path: array_path(&chrom.name, resolution),
                    })
                    .collect(),
                kind: MULTISCALES_TYPE.to_string(),
                metadata: ChromMetadata {
                    chromsize: chrom.length,
                },
            })
            .collect();

        Self {
            row_infos,
            tile_size: TILE_SIZE,
            resolutions,
            min_pos: vec![0],
            max_pos: vec![catalog.total_length()],
            shape: vec![TILE_SIZE, num_samples],
            name: name.to_string(),
            coord_system: catalog.assembly().to_string(),
            chrom_sizes: catalog
                .chromosomes()
                .iter()
                .map(|chrom| (chrom.name.clone(), chrom.length))
                .collect(),
            multiscales,
        }
    }
}
