use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{ConvertResult, ProgressEvent, ProgressSink};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_convert(result: &ConvertResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress events to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

pub fn print_summary(result: &ConvertResult) {
    println!(
        "{}: {} samples ({} ingested, {} skipped), {} arrays, resolutions {}..{}",
        result.output,
        result.samples.len(),
        result.ingested,
        result.skipped,
        result.arrays,
        result.resolutions.last().copied().unwrap_or_default(),
        result.resolutions.first().copied().unwrap_or_default(),
    );
    for sample in result.samples.iter().filter(|sample| sample.is_skipped()) {
        println!("  skipped {} ({})", sample.id, sample.track);
    }
}
