use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{Aggregation, AssemblyId, ResolutionLadder, SampleId};
use crate::error::ConvertError;
use crate::layout::StorageOptions;
use crate::metadata::coord_system_for_name;

pub const DEFAULT_ASSEMBLY: &str = "hg38";
pub const DEFAULT_STARTING_RESOLUTION: u64 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(alias = "input_track_files")]
    pub input_bigwig_files: Vec<String>,
    pub input_metadata_files: Vec<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub starting_resolution: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub chrom_sizes: Option<String>,
    #[serde(default)]
    pub aggregation: Option<Aggregation>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub chunk_width: Option<u64>,
    #[serde(default)]
    pub compression_level: Option<u32>,
}

/// Command-line values that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestOverrides {
    pub output: Option<String>,
    pub starting_resolution: Option<u64>,
    pub name: Option<String>,
    pub assembly: Option<String>,
    pub chrom_sizes: Option<String>,
    pub aggregation: Option<Aggregation>,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInput {
    pub index: usize,
    pub id: SampleId,
    pub track: Utf8PathBuf,
    pub metadata: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub samples: Vec<SampleInput>,
    pub output: Utf8PathBuf,
    pub ladder: ResolutionLadder,
    pub name: String,
    pub assembly: AssemblyId,
    pub chrom_sizes: Option<Utf8PathBuf>,
    pub aggregation: Aggregation,
    /// `None` ingests samples one after another; `Some(0)` uses every core.
    pub threads: Option<usize>,
    pub storage: StorageOptions,
}

pub struct ManifestLoader;

impl ManifestLoader {
    pub fn resolve(
        path: &str,
        overrides: ManifestOverrides,
    ) -> Result<ResolvedManifest, ConvertError> {
        let manifest_path = PathBuf::from(path);
        let content = fs::read_to_string(&manifest_path)
            .map_err(|_| ConvertError::ManifestRead(manifest_path.clone()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|err| ConvertError::ManifestParse(err.to_string()))?;

        Self::resolve_manifest(manifest, overrides)
    }

    /// Checks everything that must hold before the store is touched.
    pub fn resolve_manifest(
        manifest: Manifest,
        overrides: ManifestOverrides,
    ) -> Result<ResolvedManifest, ConvertError> {
        if manifest.input_bigwig_files.len() != manifest.input_metadata_files.len() {
            return Err(ConvertError::MetadataMismatch {
                tracks: manifest.input_bigwig_files.len(),
                metadata: manifest.input_metadata_files.len(),
            });
        }

        let output = overrides
            .output
            .or(manifest.output)
            .filter(|value| !value.trim().is_empty())
            .map(Utf8PathBuf::from)
            .ok_or(ConvertError::MissingOutput)?;

        let starting_resolution = overrides
            .starting_resolution
            .or(manifest.starting_resolution)
            .unwrap_or(DEFAULT_STARTING_RESOLUTION);
        let ladder = ResolutionLadder::new(starting_resolution)?;

        let name = overrides
            .name
            .or(manifest.name)
            .unwrap_or_else(|| default_name(&output));

        let assembly = match overrides.assembly.or(manifest.assembly) {
            Some(value) => value.parse()?,
            None => coord_system_for_name(&name)
                .unwrap_or(DEFAULT_ASSEMBLY)
                .parse()?,
        };

        let mut storage = StorageOptions::default();
        if let Some(chunk_width) = manifest.chunk_width {
            if chunk_width == 0 {
                return Err(ConvertError::ManifestParse(
                    "chunk_width must be positive".to_string(),
                ));
            }
            storage.chunk_width = chunk_width;
        }
        if let Some(level) = manifest.compression_level {
            if level > 9 {
                return Err(ConvertError::ManifestParse(format!(
                    "compression_level must be 0-9, got {level}"
                )));
            }
            storage.compression_level = level;
        }

        let samples = manifest
            .input_bigwig_files
            .into_iter()
            .zip(manifest.input_metadata_files)
            .enumerate()
            .map(|(index, (track, metadata))| {
                let track = Utf8PathBuf::from(track);
                SampleInput {
                    index,
                    id: SampleId::from_track_path(&track),
                    track,
                    metadata: Utf8PathBuf::from(metadata),
                }
            })
            .collect();

        Ok(ResolvedManifest {
            samples,
            output,
            ladder,
            name,
            assembly,
            chrom_sizes: overrides
                .chrom_sizes
                .or(manifest.chrom_sizes)
                .map(Utf8PathBuf::from),
            aggregation: overrides
                .aggregation
                .or(manifest.aggregation)
                .unwrap_or_default(),
            threads: overrides.threads.or(manifest.threads),
            storage,
        })
    }
}

fn default_name(output: &Utf8Path) -> String {
    output
        .file_stem()
        .map(str::to_string)
        .unwrap_or_else(|| output.to_string())
}
