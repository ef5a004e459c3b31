use std::fs;
use std::sync::OnceLock;

use camino::Utf8PathBuf;
use regex::Regex;

use crate::domain::{AssemblyId, Catalog, Chromosome};
use crate::error::ConvertError;

/// Supplies the canonical chromosome catalog for a reference assembly.
pub trait CoordinateRegistry: Send + Sync {
    fn catalog_for_assembly(&self, assembly: &AssemblyId) -> Result<Catalog, ConvertError>;
}

const HG38: &[(&str, u64)] = &[
    ("chr1", 248_956_422),
    ("chr2", 242_193_529),
    ("chr3", 198_295_559),
    ("chr4", 190_214_555),
    ("chr5", 181_538_259),
    ("chr6", 170_805_979),
    ("chr7", 159_345_973),
    ("chr8", 145_138_636),
    ("chr9", 138_394_717),
    ("chr10", 133_797_422),
    ("chr11", 135_086_622),
    ("chr12", 133_275_309),
    ("chr13", 114_364_328),
    ("chr14", 107_043_718),
    ("chr15", 101_991_189),
    ("chr16", 90_338_345),
    ("chr17", 83_257_441),
    ("chr18", 80_373_285),
    ("chr19", 58_617_616),
    ("chr20", 64_444_167),
    ("chr21", 46_709_983),
    ("chr22", 50_818_468),
    ("chrX", 156_040_895),
    ("chrY", 57_227_415),
    ("chrM", 16_569),
];

const HG19: &[(&str, u64)] = &[
    ("chr1", 249_250_621),
    ("chr2", 243_199_373),
    ("chr3", 198_022_430),
    ("chr4", 191_154_276),
    ("chr5", 180_915_260),
    ("chr6", 171_115_067),
    ("chr7", 159_138_663),
    ("chr8", 146_364_022),
    ("chr9", 141_213_431),
    ("chr10", 135_534_747),
    ("chr11", 135_006_516),
    ("chr12", 133_851_895),
    ("chr13", 115_169_878),
    ("chr14", 107_349_540),
    ("chr15", 102_531_392),
    ("chr16", 90_354_753),
    ("chr17", 81_195_210),
    ("chr18", 78_077_248),
    ("chr19", 59_128_983),
    ("chr20", 63_025_520),
    ("chr21", 48_129_895),
    ("chr22", 51_304_566),
    ("chrX", 155_270_560),
    ("chrY", 59_373_566),
    ("chrM", 16_571),
];

const MM10: &[(&str, u64)] = &[
    ("chr1", 195_471_971),
    ("chr2", 182_113_224),
    ("chr3", 160_039_680),
    ("chr4", 156_508_116),
    ("chr5", 151_834_684),
    ("chr6", 149_736_546),
    ("chr7", 145_441_459),
    ("chr8", 129_401_213),
    ("chr9", 124_595_110),
    ("chr10", 130_694_993),
    ("chr11", 122_082_543),
    ("chr12", 120_129_022),
    ("chr13", 120_421_639),
    ("chr14", 124_902_244),
    ("chr15", 104_043_685),
    ("chr16", 98_207_768),
    ("chr17", 94_987_271),
    ("chr18", 90_702_639),
    ("chr19", 61_431_566),
    ("chrX", 171_031_299),
    ("chrY", 91_744_698),
    ("chrM", 16_299),
];

/// Primary-chromosome tables compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRegistry;

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl CoordinateRegistry for BuiltinRegistry {
    fn catalog_for_assembly(&self, assembly: &AssemblyId) -> Result<Catalog, ConvertError> {
        let table = match assembly.as_str() {
            "hg38" | "GRCh38" => HG38,
            "hg19" | "GRCh37" => HG19,
            "mm10" | "GRCm38" => MM10,
            other => return Err(ConvertError::UnknownAssembly(other.to_string())),
        };
        let chromosomes = table
            .iter()
            .map(|(name, length)| Chromosome {
                name: (*name).to_string(),
                length: *length,
            })
            .collect();
        Catalog::new(assembly.clone(), chromosomes)
    }
}

/// Reads a UCSC `chrom.sizes` file and keeps the primary chromosomes.
///
/// The catalog is named after whatever assembly is requested; the file is
/// the only source of coordinates.
#[derive(Debug, Clone)]
pub struct ChromSizesRegistry {
    path: Utf8PathBuf,
}

impl ChromSizesRegistry {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CoordinateRegistry for ChromSizesRegistry {
    fn catalog_for_assembly(&self, assembly: &AssemblyId) -> Result<Catalog, ConvertError> {
        let content = fs::read_to_string(self.path.as_std_path())
            .map_err(|err| ConvertError::ChromSizes(format!("{}: {err}", self.path)))?;
        let chromosomes = parse_chrom_sizes(&content)?;
        Catalog::new(assembly.clone(), primary_only(chromosomes))
    }
}

/// Parses `name<TAB>length` lines; blank lines and `#` comments are skipped.
pub fn parse_chrom_sizes(content: &str) -> Result<Vec<Chromosome>, ConvertError> {
    let mut chromosomes = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(length)) = (fields.next(), fields.next()) else {
            return Err(ConvertError::ChromSizes(format!(
                "line {}: expected `name length`",
                line_no + 1
            )));
        };
        let length = length.parse::<u64>().map_err(|err| {
            ConvertError::ChromSizes(format!("line {}: bad length {length}: {err}", line_no + 1))
        })?;
        chromosomes.push(Chromosome {
            name: name.to_string(),
            length,
        });
    }
    Ok(chromosomes)
}

/// Drops unplaced and alternate contigs and sorts the rest as
/// chr1..chrN, chrX, chrY, chrM.
pub fn primary_only(chromosomes: Vec<Chromosome>) -> Vec<Chromosome> {
    let mut ranked = chromosomes
        .into_iter()
        .filter_map(|chrom| primary_rank(&chrom.name).map(|rank| (rank, chrom)))
        .collect::<Vec<_>>();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, chrom)| chrom).collect()
}

fn primary_rank(name: &str) -> Option<u32> {
    static PRIMARY: OnceLock<Regex> = OnceLock::new();
    let re = PRIMARY.get_or_init(|| {
        Regex::new(r"^chr([1-9][0-9]?|X|Y|M)$").expect("primary chromosome pattern is valid")
    });
    let caps = re.captures(name)?;
    match &caps[1] {
        "X" => Some(1_000),
        "Y" => Some(1_001),
        "M" => Some(1_002),
        number => number.parse().ok(),
    }
}
