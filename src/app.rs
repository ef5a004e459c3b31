use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::catalog::CoordinateRegistry;
use crate::config::ResolvedManifest;
use crate::error::ConvertError;
use crate::ingest::{Ingestor, SampleOutcome};
use crate::layout::StoreLayout;
use crate::metadata::{StoreAttributes, load_row_infos};
use crate::row_info::RowInfoTransform;
use crate::track::TrackReader;

#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    pub output: String,
    pub name: String,
    pub assembly: String,
    pub resolutions: Vec<u64>,
    pub arrays: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub samples: Vec<SampleOutcome>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// The conversion pipeline: layout, ingestion, then attributes.
#[derive(Clone)]
pub struct App<C: CoordinateRegistry, R: TrackReader, T: RowInfoTransform> {
    registry: C,
    reader: R,
    transform: T,
}

impl<C: CoordinateRegistry, R: TrackReader, T: RowInfoTransform> App<C, R, T> {
    pub fn new(registry: C, reader: R, transform: T) -> Self {
        Self {
            registry,
            reader,
            transform,
        }
    }

    /// Builds the store described by `manifest`.
    ///
    /// Catalog and metadata problems abort before the output location is
    /// touched. A fetch failure during ingestion aborts with the partially
    /// filled store left in place.
    pub fn convert(
        &self,
        manifest: &ResolvedManifest,
        sink: &dyn ProgressSink,
    ) -> Result<ConvertResult, ConvertError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; catalog for {}", manifest.assembly),
            elapsed: None,
        });
        let catalog = self.registry.catalog_for_assembly(&manifest.assembly)?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Metadata; reading {} sample descriptors",
                manifest.samples.len()
            ),
            elapsed: None,
        });
        let row_infos = load_row_infos(&manifest.samples, &self.transform)?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Layout; allocating {} chromosomes x {} resolutions",
                catalog.len(),
                manifest.ladder.levels().len()
            ),
            elapsed: None,
        });
        let start = Instant::now();
        let layout = StoreLayout::build(
            &manifest.output,
            &catalog,
            &manifest.ladder,
            manifest.samples.len(),
            manifest.storage,
        )?;
        sink.event(ProgressEvent {
            message: format!("store.created arrays={}", layout.array_count()),
            elapsed: Some(start.elapsed()),
        });

        sink.event(ProgressEvent {
            message: format!("phase=Ingest; {} tracks", manifest.samples.len()),
            elapsed: None,
        });
        let start = Instant::now();
        let ingestor = Ingestor::new(
            &self.reader,
            &catalog,
            &manifest.ladder,
            &layout,
            manifest.aggregation,
        );
        let samples = ingestor.ingest_all(&manifest.samples, manifest.threads)?;
        let skipped = samples.iter().filter(|sample| sample.is_skipped()).count();
        sink.event(ProgressEvent {
            message: format!(
                "ingest.done ingested={} skipped={skipped}",
                samples.len() - skipped
            ),
            elapsed: Some(start.elapsed()),
        });

        sink.event(ProgressEvent {
            message: "phase=Attributes; writing store attributes".to_string(),
            elapsed: None,
        });
        let attributes =
            StoreAttributes::assemble(&catalog, &manifest.ladder, &manifest.name, row_infos);
        layout.store().write_attributes("", &attributes)?;

        info!(
            output = %manifest.output,
            samples = samples.len(),
            skipped,
            "conversion finished"
        );
        Ok(ConvertResult {
            output: manifest.output.to_string(),
            name: manifest.name.clone(),
            assembly: catalog.assembly().to_string(),
            resolutions: attributes.resolutions,
            arrays: layout.array_count(),
            ingested: samples.len() - skipped,
            skipped,
            samples,
        })
    }
}
