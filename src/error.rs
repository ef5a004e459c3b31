use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("invalid starting resolution: {0}")]
    InvalidResolution(String),

    #[error("invalid assembly identifier: {0}")]
    InvalidAssembly(String),

    #[error("no chromosome catalog for assembly {0}")]
    UnknownAssembly(String),

    #[error("failed to read chromosome sizes: {0}")]
    ChromSizes(String),

    #[error("failed to read manifest at {0}")]
    ManifestRead(PathBuf),

    #[error("failed to parse JSON manifest: {0}")]
    ManifestParse(String),

    #[error("no output location given (set `output` in the manifest or pass --output)")]
    MissingOutput,

    #[error("{tracks} track files but {metadata} metadata files; rows would misalign")]
    MetadataMismatch { tracks: usize, metadata: usize },

    #[error("sample {sample}: metadata file {path} is missing")]
    MetadataMissing { sample: usize, path: String },

    #[error("sample {sample}: metadata file {path} is malformed: {message}")]
    MetadataMalformed {
        sample: usize,
        path: String,
        message: String,
    },

    #[error("store location {path} is not writable: {message}")]
    StoreUnwritable { path: String, message: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("array {array} expects {expected} values per row, got {actual}")]
    ShapeMismatch {
        array: String,
        expected: u64,
        actual: u64,
    },

    #[error("sample {sample}: failed to summarize {chrom} at resolution {resolution}: {message}")]
    Fetch {
        sample: String,
        chrom: String,
        resolution: u64,
        message: String,
    },

    #[error("failed to read track {path}: {message}")]
    TrackRead { path: String, message: String },

    #[error("failed to start ingestion workers: {0}")]
    ThreadPool(String),
}
