use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use zarr_multivec::app::App;
use zarr_multivec::catalog::{BuiltinRegistry, ChromSizesRegistry, CoordinateRegistry};
use zarr_multivec::config::{ManifestLoader, ManifestOverrides, ResolvedManifest};
use zarr_multivec::domain::Aggregation;
use zarr_multivec::error::ConvertError;
use zarr_multivec::output::{JsonOutput, LogSink, print_summary};
use zarr_multivec::row_info::{CistromeRowInfo, PassthroughRowInfo, RowInfoTransform};
use zarr_multivec::track::BigWigReader;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetadataFormat {
    Cistrome,
    Passthrough,
}

#[derive(Parser)]
#[command(name = "bigwigs-to-zarr")]
#[command(about = "Convert per-sample bigWig tracks into a multi-resolution zarr store")]
#[command(version, author)]
struct Cli {
    /// JSON manifest listing input_bigwig_files and input_metadata_files
    #[arg(short, long)]
    input: String,

    #[arg(short, long)]
    output: Option<String>,

    #[arg(short, long)]
    starting_resolution: Option<u64>,

    #[arg(short, long)]
    name: Option<String>,

    #[arg(long)]
    assembly: Option<String>,

    /// UCSC chrom.sizes file used instead of the built-in assemblies
    #[arg(long)]
    chrom_sizes: Option<String>,

    #[arg(long)]
    aggregation: Option<Aggregation>,

    /// Ingest samples in parallel (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long, value_enum, default_value = "cistrome")]
    metadata_format: MetadataFormat,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ConvertError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ConvertError) -> u8 {
    match error {
        ConvertError::InvalidResolution(_)
        | ConvertError::InvalidAssembly(_)
        | ConvertError::UnknownAssembly(_)
        | ConvertError::ChromSizes(_)
        | ConvertError::ManifestRead(_)
        | ConvertError::ManifestParse(_)
        | ConvertError::MissingOutput
        | ConvertError::MetadataMismatch { .. }
        | ConvertError::MetadataMissing { .. }
        | ConvertError::MetadataMalformed { .. } => 2,
        ConvertError::StoreUnwritable { .. }
        | ConvertError::Store(_)
        | ConvertError::ShapeMismatch { .. }
        | ConvertError::Fetch { .. }
        | ConvertError::TrackRead { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = ManifestOverrides {
        output: cli.output,
        starting_resolution: cli.starting_resolution,
        name: cli.name,
        assembly: cli.assembly,
        chrom_sizes: cli.chrom_sizes,
        aggregation: cli.aggregation,
        threads: cli.threads,
    };
    let manifest = ManifestLoader::resolve(&cli.input, overrides)?;

    match (manifest.chrom_sizes.clone(), cli.metadata_format) {
        (Some(path), MetadataFormat::Cistrome) => {
            convert(ChromSizesRegistry::new(path), CistromeRowInfo, &manifest, cli.json)
        }
        (Some(path), MetadataFormat::Passthrough) => {
            convert(ChromSizesRegistry::new(path), PassthroughRowInfo, &manifest, cli.json)
        }
        (None, MetadataFormat::Cistrome) => {
            convert(BuiltinRegistry::new(), CistromeRowInfo, &manifest, cli.json)
        }
        (None, MetadataFormat::Passthrough) => {
            convert(BuiltinRegistry::new(), PassthroughRowInfo, &manifest, cli.json)
        }
    }
}

fn convert<C: CoordinateRegistry, T: RowInfoTransform>(
    registry: C,
    transform: T,
    manifest: &ResolvedManifest,
    json: bool,
) -> miette::Result<()> {
    let app = App::new(registry, BigWigReader::new(), transform);
    if json {
        let result = app.convert(manifest, &JsonOutput)?;
        JsonOutput::print_convert(&result).into_diagnostic()?;
    } else {
        let result = app.convert(manifest, &LogSink)?;
        print_summary(&result);
    }
    Ok(())
}
