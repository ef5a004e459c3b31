use std::fmt;
use std::str::FromStr;

use camino::Utf8Path;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Number of levels in every resolution pyramid.
pub const LADDER_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyId(String);

impl AssemblyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssemblyId {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '-');
        if !is_valid {
            return Err(ConvertError::InvalidAssembly(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Stable identifier of one input sample, carried alongside its row index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derives the identifier from a track path: the file name without
    /// its extensions (`/data/46201.bw` becomes `46201`).
    pub fn from_track_path(path: &Utf8Path) -> Self {
        let file_name = path.file_name().unwrap_or(path.as_str());
        let stem = file_name.split('.').next().unwrap_or(file_name);
        if stem.is_empty() {
            Self(file_name.to_string())
        } else {
            Self(stem.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    pub name: String,
    pub length: u64,
}

/// Ordered primary chromosomes of one reference assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    assembly: AssemblyId,
    chromosomes: Vec<Chromosome>,
}

impl Catalog {
    pub fn new(assembly: AssemblyId, chromosomes: Vec<Chromosome>) -> Result<Self, ConvertError> {
        if chromosomes.is_empty() {
            return Err(ConvertError::ChromSizes(format!(
                "catalog for {assembly} has no chromosomes"
            )));
        }
        for (i, chrom) in chromosomes.iter().enumerate() {
            if chrom.length == 0 {
                return Err(ConvertError::ChromSizes(format!(
                    "chromosome {} has zero length",
                    chrom.name
                )));
            }
            if chromosomes[..i].iter().any(|other| other.name == chrom.name) {
                return Err(ConvertError::ChromSizes(format!(
                    "chromosome {} listed twice",
                    chrom.name
                )));
            }
        }
        Ok(Self {
            assembly,
            chromosomes,
        })
    }

    pub fn assembly(&self) -> &AssemblyId {
        &self.assembly
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn get(&self, name: &str) -> Option<&Chromosome> {
        self.chromosomes.iter().find(|chrom| chrom.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn total_length(&self) -> u64 {
        self.chromosomes.iter().map(|chrom| chrom.length).sum()
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }
}

/// Geometric sequence of bin widths, finest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionLadder {
    levels: Vec<u64>,
}

impl ResolutionLadder {
    pub fn new(starting_resolution: u64) -> Result<Self, ConvertError> {
        if starting_resolution == 0 {
            return Err(ConvertError::InvalidResolution(
                "starting resolution must be positive".to_string(),
            ));
        }
        let mut levels = Vec::with_capacity(LADDER_DEPTH);
        let mut current = starting_resolution;
        for level in 0..LADDER_DEPTH {
            levels.push(current);
            if level + 1 < LADDER_DEPTH {
                current = current.checked_mul(2).ok_or_else(|| {
                    ConvertError::InvalidResolution(format!(
                        "starting resolution {starting_resolution} overflows at level {}",
                        level + 1
                    ))
                })?;
            }
        }
        Ok(Self { levels })
    }

    pub fn starting(&self) -> u64 {
        self.levels[0]
    }

    /// Finest to coarsest.
    pub fn levels(&self) -> &[u64] {
        &self.levels
    }

    /// Coarsest to finest, the order used in store attributes.
    pub fn descending(&self) -> Vec<u64> {
        self.levels.iter().rev().copied().collect()
    }
}

/// Number of bins of width `resolution` needed to cover `length` bases.
pub fn bin_count(length: u64, resolution: u64) -> u64 {
    length.div_ceil(resolution)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
    Min,
    Max,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Sum => write!(f, "sum"),
            Aggregation::Mean => write!(f, "mean"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Max => write!(f, "max"),
        }
    }
}
