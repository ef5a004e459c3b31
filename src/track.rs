use std::collections::BTreeMap;

use bigtools::BigWigRead;
use bigtools::utils::reopen::ReopenableFile;
use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Aggregation, bin_count};
use crate::error::ConvertError;

/// Fixed-width bins over `[start, end)`; the last bin is truncated at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinLayout {
    pub start: u64,
    pub end: u64,
    pub bin_width: u64,
}

impl BinLayout {
    /// Bins of `resolution` bases covering a whole chromosome.
    pub fn whole_chromosome(length: u64, resolution: u64) -> Self {
        Self {
            start: 0,
            end: length,
            bin_width: resolution,
        }
    }

    pub fn num_bins(&self) -> u64 {
        bin_count(self.end.saturating_sub(self.start), self.bin_width)
    }

    pub fn bin_bounds(&self, bin: u64) -> (u64, u64) {
        let start = self.start + bin * self.bin_width;
        (start, (start + self.bin_width).min(self.end))
    }
}

/// One opened signal track. Opening once per sample keeps file handles and
/// parsed headers alive across every chromosome and resolution.
pub trait Track {
    fn chrom_sizes(&self) -> BTreeMap<String, u64>;

    /// One value per bin of `layout`, aggregated with `aggregation`.
    fn summarize(
        &mut self,
        chrom: &str,
        layout: BinLayout,
        aggregation: Aggregation,
    ) -> Result<Vec<f32>, ConvertError>;
}

/// Opens genome-wide signal tracks.
pub trait TrackReader: Send + Sync {
    type Opened: Track;

    /// Whether `path` is a readable track in the expected format.
    fn is_valid(&self, path: &Utf8Path) -> bool;

    fn open(&self, path: &Utf8Path) -> Result<Self::Opened, ConvertError>;

    fn chrom_sizes(&self, path: &Utf8Path) -> Result<BTreeMap<String, u64>, ConvertError> {
        Ok(self.open(path)?.chrom_sizes())
    }

    fn summarize(
        &self,
        path: &Utf8Path,
        chrom: &str,
        layout: BinLayout,
        aggregation: Aggregation,
    ) -> Result<Vec<f32>, ConvertError> {
        self.open(path)?.summarize(chrom, layout, aggregation)
    }
}

/// bigWig reader backed by `bigtools`. Summaries are computed from the raw
/// intervals rather than the file's zoom levels, so they are exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigWigReader;

impl BigWigReader {
    pub fn new() -> Self {
        Self
    }
}

impl TrackReader for BigWigReader {
    type Opened = BigWigTrack;

    fn is_valid(&self, path: &Utf8Path) -> bool {
        BigWigRead::open_file(path.as_str()).is_ok()
    }

    fn open(&self, path: &Utf8Path) -> Result<BigWigTrack, ConvertError> {
        let reader = BigWigRead::open_file(path.as_str()).map_err(|err| ConvertError::TrackRead {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        Ok(BigWigTrack {
            path: path.to_owned(),
            reader,
        })
    }
}

pub struct BigWigTrack {
    path: Utf8PathBuf,
    reader: BigWigRead<ReopenableFile>,
}

impl Track for BigWigTrack {
    fn chrom_sizes(&self) -> BTreeMap<String, u64> {
        self.reader
            .chroms()
            .iter()
            .map(|info| (info.name.clone(), u64::from(info.length)))
            .collect()
    }

    fn summarize(
        &mut self,
        chrom: &str,
        layout: BinLayout,
        aggregation: Aggregation,
    ) -> Result<Vec<f32>, ConvertError> {
        let read_err = |message: String| ConvertError::TrackRead {
            path: self.path.to_string(),
            message,
        };
        let start = u32::try_from(layout.start)
            .map_err(|_| read_err(format!("start {} exceeds bigWig range", layout.start)))?;
        let end = u32::try_from(layout.end)
            .map_err(|_| read_err(format!("end {} exceeds bigWig range", layout.end)))?;

        let mut acc = BinAccumulator::new(layout, aggregation);
        let intervals = self
            .reader
            .get_interval(chrom, start, end)
            .map_err(|err| read_err(format!("{chrom}: {err}")))?;
        for value in intervals {
            let value = value.map_err(|err| read_err(format!("{chrom}: {err}")))?;
            acc.add(u64::from(value.start), u64::from(value.end), value.value);
        }
        Ok(acc.finish())
    }
}

/// Rolls constant-valued intervals up into the bins of a [`BinLayout`].
///
/// Sums weight each value by the number of bases it covers inside the bin.
/// Bins no interval touches come out as `0.0` for sums and NaN otherwise.
/// Only the result row is held, plus per-bin coverage for means.
#[derive(Debug, Clone)]
pub struct BinAccumulator {
    layout: BinLayout,
    aggregation: Aggregation,
    values: Vec<f32>,
    covered: Vec<u64>,
}

impl BinAccumulator {
    pub fn new(layout: BinLayout, aggregation: Aggregation) -> Self {
        let bins = layout.num_bins() as usize;
        let (fill, covered) = match aggregation {
            Aggregation::Sum => (0.0, Vec::new()),
            Aggregation::Mean => (0.0, vec![0; bins]),
            Aggregation::Min | Aggregation::Max => (f32::NAN, Vec::new()),
        };
        Self {
            layout,
            aggregation,
            values: vec![fill; bins],
            covered,
        }
    }

    pub fn add(&mut self, start: u64, end: u64, value: f32) {
        if value.is_nan() || self.values.is_empty() {
            return;
        }
        let start = start.max(self.layout.start);
        let end = end.min(self.layout.end);
        if start >= end {
            return;
        }
        let first = (start - self.layout.start) / self.layout.bin_width;
        let last = (end - 1 - self.layout.start) / self.layout.bin_width;
        for bin in first..=last {
            let (bin_start, bin_end) = self.layout.bin_bounds(bin);
            let overlap = end.min(bin_end) - start.max(bin_start);
            let i = bin as usize;
            let slot = &mut self.values[i];
            match self.aggregation {
                Aggregation::Sum | Aggregation::Mean => {
                    *slot = (f64::from(*slot) + f64::from(value) * overlap as f64) as f32;
                    if let Some(covered) = self.covered.get_mut(i) {
                        *covered += overlap;
                    }
                }
                Aggregation::Min => {
                    if slot.is_nan() || value < *slot {
                        *slot = value;
                    }
                }
                Aggregation::Max => {
                    if slot.is_nan() || value > *slot {
                        *slot = value;
                    }
                }
            }
        }
    }

    pub fn finish(mut self) -> Vec<f32> {
        if self.aggregation == Aggregation::Mean {
            for (value, &covered) in self.values.iter_mut().zip(&self.covered) {
                *value = if covered == 0 {
                    f32::NAN
                } else {
                    (f64::from(*value) / covered as f64) as f32
                };
            }
        }
        self.values
    }
}
