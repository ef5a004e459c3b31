#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};

use zarr_multivec::app::{ProgressEvent, ProgressSink};
use zarr_multivec::catalog::CoordinateRegistry;
use zarr_multivec::config::{Manifest, ManifestLoader, ManifestOverrides, ResolvedManifest};
use zarr_multivec::domain::{Aggregation, AssemblyId, Catalog, Chromosome};
use zarr_multivec::error::ConvertError;
use zarr_multivec::track::{BinLayout, Track, TrackReader};

pub struct MockRegistry {
    pub chromosomes: Vec<(&'static str, u64)>,
}

impl MockRegistry {
    /// chr1: 1000, chr2: 500
    pub fn small() -> Self {
        Self {
            chromosomes: vec![("chr1", 1000), ("chr2", 500)],
        }
    }
}

impl CoordinateRegistry for MockRegistry {
    fn catalog_for_assembly(&self, assembly: &AssemblyId) -> Result<Catalog, ConvertError> {
        let chromosomes = self
            .chromosomes
            .iter()
            .map(|(name, length)| Chromosome {
                name: (*name).to_string(),
                length: *length,
            })
            .collect();
        Catalog::new(assembly.clone(), chromosomes)
    }
}

#[derive(Default, Clone)]
pub struct MockTrack {
    pub chroms: BTreeMap<String, u64>,
    pub values: HashMap<(String, u64), Vec<f32>>,
    pub fail_on: Option<(String, u64)>,
}

impl MockTrack {
    pub fn with_chroms(chroms: &[(&str, u64)]) -> Self {
        Self {
            chroms: chroms
                .iter()
                .map(|(name, length)| ((*name).to_string(), *length))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_values(mut self, chrom: &str, resolution: u64, values: Vec<f32>) -> Self {
        self.values.insert((chrom.to_string(), resolution), values);
        self
    }

    pub fn failing_on(mut self, chrom: &str, resolution: u64) -> Self {
        self.fail_on = Some((chrom.to_string(), resolution));
        self
    }
}

/// Tracks keyed by path; a path mapped to `None` fails validation.
#[derive(Default)]
pub struct MockReader {
    pub tracks: HashMap<String, Option<MockTrack>>,
    pub opened: Mutex<Vec<String>>,
    pub calls: Arc<Mutex<Vec<(String, String, u64)>>>,
}

impl MockReader {
    pub fn insert(&mut self, path: &Utf8Path, track: Option<MockTrack>) {
        self.tracks.insert(path.to_string(), track);
    }
}

/// Deterministic filler: bin i of `chrom` at `resolution` holds
/// `resolution + i + chrom.len()`.
pub fn synthetic_values(chrom: &str, layout: BinLayout) -> Vec<f32> {
    (0..layout.num_bins())
        .map(|i| (layout.bin_width + i + chrom.len() as u64) as f32)
        .collect()
}

impl TrackReader for MockReader {
    type Opened = OpenedMockTrack;

    fn is_valid(&self, path: &Utf8Path) -> bool {
        matches!(self.tracks.get(path.as_str()), Some(Some(_)))
    }

    fn open(&self, path: &Utf8Path) -> Result<OpenedMockTrack, ConvertError> {
        let track = self
            .tracks
            .get(path.as_str())
            .and_then(Option::as_ref)
            .ok_or_else(|| ConvertError::TrackRead {
                path: path.to_string(),
                message: "no such mock track".to_string(),
            })?;
        self.opened.lock().unwrap().push(path.to_string());
        Ok(OpenedMockTrack {
            path: path.to_string(),
            track: track.clone(),
            calls: Arc::clone(&self.calls),
        })
    }
}

pub struct OpenedMockTrack {
    path: String,
    track: MockTrack,
    calls: Arc<Mutex<Vec<(String, String, u64)>>>,
}

impl Track for OpenedMockTrack {
    fn chrom_sizes(&self) -> BTreeMap<String, u64> {
        self.track.chroms.clone()
    }

    fn summarize(
        &mut self,
        chrom: &str,
        layout: BinLayout,
        aggregation: Aggregation,
    ) -> Result<Vec<f32>, ConvertError> {
        assert_eq!(aggregation, Aggregation::Sum);
        self.calls
            .lock()
            .unwrap()
            .push((self.path.clone(), chrom.to_string(), layout.bin_width));
        if self.track.fail_on.as_ref() == Some(&(chrom.to_string(), layout.bin_width)) {
            return Err(ConvertError::TrackRead {
                path: self.path.clone(),
                message: "truncated data block".to_string(),
            });
        }
        Ok(self
            .track
            .values
            .get(&(chrom.to_string(), layout.bin_width))
            .cloned()
            .unwrap_or_else(|| synthetic_values(chrom, layout)))
    }
}

pub struct RecordingSink {
    pub events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event.message);
    }
}

pub fn utf8_root(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
}

/// Writes one Cistrome-style descriptor per track and resolves a manifest
/// over them with starting resolution 100.
pub fn manifest_for(root: &Utf8Path, tracks: &[&str]) -> ResolvedManifest {
    let mut input_bigwig_files = Vec::new();
    let mut input_metadata_files = Vec::new();
    for (i, track) in tracks.iter().enumerate() {
        let metadata = root.join(format!("meta/{track}.json"));
        std::fs::create_dir_all(metadata.parent().unwrap().as_std_path()).unwrap();
        std::fs::write(
            metadata.as_std_path(),
            serde_json::json!({
                "id": 1000 + i,
                "species": "Homo sapiens",
                "factor": {"name": format!("F{i}")},
                "cell_type": {"name": "T cell"}
            })
            .to_string(),
        )
        .unwrap();
        input_bigwig_files.push(root.join(format!("tracks/{track}.bw")).to_string());
        input_metadata_files.push(metadata.to_string());
    }
    let manifest = Manifest {
        input_bigwig_files,
        input_metadata_files,
        output: Some(root.join("out/store.zarr").to_string()),
        starting_resolution: Some(100),
        name: Some("test__dataset".to_string()),
        assembly: Some("test".to_string()),
        ..Manifest::default()
    };
    ManifestLoader::resolve_manifest(manifest, ManifestOverrides::default()).unwrap()
}

pub fn track_path(root: &Utf8Path, track: &str) -> Utf8PathBuf {
    root.join(format!("tracks/{track}.bw"))
}
