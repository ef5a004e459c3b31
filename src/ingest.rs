use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SampleInput;
use crate::domain::{Aggregation, Catalog, Chromosome, ResolutionLadder};
use crate::error::ConvertError;
use crate::layout::{StoreLayout, array_path};
use crate::track::{BinLayout, Track, TrackReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SampleStatus {
    Ingested { chromosomes: Vec<String> },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleOutcome {
    pub index: usize,
    pub id: String,
    pub track: String,
    #[serde(flatten)]
    pub status: SampleStatus,
}

impl SampleOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, SampleStatus::Skipped { .. })
    }
}

/// Fills sample rows of a preallocated layout from their tracks.
///
/// Every sample writes only its own row, so samples can be ingested in any
/// order or concurrently.
pub struct Ingestor<'a, R: TrackReader> {
    reader: &'a R,
    catalog: &'a Catalog,
    ladder: &'a ResolutionLadder,
    layout: &'a StoreLayout,
    aggregation: Aggregation,
}

impl<'a, R: TrackReader> Ingestor<'a, R> {
    pub fn new(
        reader: &'a R,
        catalog: &'a Catalog,
        ladder: &'a ResolutionLadder,
        layout: &'a StoreLayout,
        aggregation: Aggregation,
    ) -> Self {
        Self {
            reader,
            catalog,
            ladder,
            layout,
            aggregation,
        }
    }

    /// Ingests all samples; `threads` as in [`crate::config::ResolvedManifest`].
    /// Outcomes come back in sample order either way.
    pub fn ingest_all(
        &self,
        samples: &[SampleInput],
        threads: Option<usize>,
    ) -> Result<Vec<SampleOutcome>, ConvertError> {
        match threads {
            None | Some(1) => samples
                .iter()
                .map(|sample| self.ingest_sample(sample))
                .collect(),
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|err| ConvertError::ThreadPool(err.to_string()))?;
                pool.install(|| {
                    samples
                        .par_iter()
                        .map(|sample| self.ingest_sample(sample))
                        .collect()
                })
            }
        }
    }

    pub fn ingest_sample(&self, sample: &SampleInput) -> Result<SampleOutcome, ConvertError> {
        let outcome = |status| SampleOutcome {
            index: sample.index,
            id: sample.id.to_string(),
            track: sample.track.to_string(),
            status,
        };

        if !self.reader.is_valid(&sample.track) {
            warn!(sample = %sample.id, track = %sample.track, "not a valid bigWig, row left empty");
            return Ok(outcome(SampleStatus::Skipped {
                reason: "not a valid bigWig file".to_string(),
            }));
        }

        let mut track = self.reader.open(&sample.track)?;
        let track_sizes = track.chrom_sizes();
        let matching = self
            .catalog
            .chromosomes()
            .iter()
            .filter(|chrom| match track_sizes.get(&chrom.name) {
                Some(&length) => {
                    if length != chrom.length {
                        warn!(
                            sample = %sample.id,
                            chrom = %chrom.name,
                            track_length = length,
                            catalog_length = chrom.length,
                            "chromosome length differs from catalog, using catalog length"
                        );
                    }
                    true
                }
                None => false,
            })
            .collect::<Vec<_>>();
        debug!(
            sample = %sample.id,
            matching = matching.len(),
            ignored = track_sizes.len() - matching.len(),
            "intersected track chromosomes with catalog"
        );

        for &resolution in self.ladder.levels() {
            for chrom in &matching {
                self.fill(sample, &mut track, chrom, resolution)?;
            }
        }

        info!(sample = %sample.id, chromosomes = matching.len(), "sample ingested");
        Ok(outcome(SampleStatus::Ingested {
            chromosomes: matching.iter().map(|chrom| chrom.name.clone()).collect(),
        }))
    }

    fn fill(
        &self,
        sample: &SampleInput,
        track: &mut R::Opened,
        chrom: &Chromosome,
        resolution: u64,
    ) -> Result<(), ConvertError> {
        let fetch_err = |message: String| ConvertError::Fetch {
            sample: format!("{} ({})", sample.index, sample.id),
            chrom: chrom.name.clone(),
            resolution,
            message,
        };

        let bins = BinLayout::whole_chromosome(chrom.length, resolution);
        let values = track
            .summarize(&chrom.name, bins, self.aggregation)
            .map_err(|err| fetch_err(err.to_string()))?;
        if values.len() as u64 != bins.num_bins() {
            return Err(fetch_err(format!(
                "reader returned {} bins, expected {}",
                values.len(),
                bins.num_bins()
            )));
        }

        let array = self.layout.array(&chrom.name, resolution).ok_or_else(|| {
            ConvertError::Store(format!(
                "array {} was not allocated",
                array_path(&chrom.name, resolution)
            ))
        })?;
        array.write_row(sample.index as u64, &values)
    }
}
