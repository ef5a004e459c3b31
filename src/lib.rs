//! Converts per-sample bigWig signal tracks into a single multi-resolution
//! zarr store that genome browsers can tile directly.
//!
//! The pipeline runs in three stages: [`layout`] allocates one NaN-filled
//! array per chromosome and resolution, [`ingest`] fills each sample's row
//! from its track, and [`metadata`] attaches row labels and tileset
//! attributes. [`app::App`] drives them in order.

pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod ingest;
pub mod layout;
pub mod metadata;
pub mod output;
pub mod row_info;
pub mod store;
pub mod track;
