//! Line-stream driver: feeds every line of a reader through a [`LogParser`]
//! and hands the results to a [`RequestSink`] in batches.
//!
//! Bad lines are logged, counted and skipped. Only I/O failures from the
//! reader or the sink stop ingestion.

use crate::error::LineError;
use crate::parser::LogParser;
use crate::sink::RequestSink;
use crate::NormalizedRequest;
use serde::Serialize;
use std::io::{self, BufRead};
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Outcome counts for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: usize,
    pub parsed: usize,
    pub blank: usize,
    pub parse_errors: usize,
    pub conversion_errors: usize,
    pub encoding_errors: usize,
}

impl IngestStats {
    pub fn skipped(&self) -> usize {
        self.parse_errors + self.conversion_errors + self.encoding_errors
    }

    fn record(&mut self, error: &LineError) {
        match error {
            LineError::Parse(_) => self.parse_errors += 1,
            LineError::Conversion(_) => self.conversion_errors += 1,
            LineError::Encoding(_) => self.encoding_errors += 1,
        }
    }
}

pub fn ingest<R, P, S>(
    reader: R,
    parser: &P,
    sink: &mut S,
    batch_size: usize,
) -> io::Result<IngestStats>
where
    R: BufRead,
    P: LogParser + ?Sized,
    S: RequestSink + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut stats = IngestStats::default();
    let mut batch: Vec<NormalizedRequest> = Vec::with_capacity(batch_size);

    for (index, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes?;
        let line_number = index + 1;
        stats.lines += 1;

        let result = std::str::from_utf8(&bytes)
            .map_err(|e| LineError::Encoding(e.to_string()))
            .and_then(|line| {
                if line.trim().is_empty() {
                    Ok(None)
                } else {
                    parser.parse(line).map(Some)
                }
            });

        match result {
            Ok(Some(request)) => {
                stats.parsed += 1;
                batch.push(request);
                if batch.len() >= batch_size {
                    sink.add_requests(&batch)?;
                    batch.clear();
                }
            }
            Ok(None) => stats.blank += 1,
            Err(e) => {
                warn!(line = line_number, parser = parser.name(), error = %e, "skipping line");
                stats.record(&e);
            }
        }
    }

    if !batch.is_empty() {
        sink.add_requests(&batch)?;
    }
    sink.flush()?;

    info!(
        lines = stats.lines,
        parsed = stats.parsed,
        skipped = stats.skipped(),
        "ingest finished"
    );
    Ok(stats)
}
