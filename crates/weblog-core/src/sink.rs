// Record store boundary - where normalized requests go after parsing

use crate::NormalizedRequest;
use std::io::{self, Write};

/// Accepts batches of normalized requests for storage.
pub trait RequestSink {
    fn add_requests(&mut self, batch: &[NormalizedRequest]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RequestSink for Vec<NormalizedRequest> {
    fn add_requests(&mut self, batch: &[NormalizedRequest]) -> io::Result<()> {
        self.extend_from_slice(batch);
        Ok(())
    }
}

/// Writes one JSON object per request, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RequestSink for JsonLinesSink<W> {
    fn add_requests(&mut self, batch: &[NormalizedRequest]) -> io::Result<()> {
        for request in batch {
            serde_json::to_writer(&mut self.writer, request)?;
            self.writer.write_all(b"\n")?;
        }
        self.written += batch.len();
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Writes each request with its `Display` form, one per line.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RequestSink for TextSink<W> {
    fn add_requests(&mut self, batch: &[NormalizedRequest]) -> io::Result<()> {
        for request in batch {
            writeln!(self.writer, "{request}")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: u16) -> NormalizedRequest {
        NormalizedRequest {
            domain: None,
            ip: 1,
            host: None,
            timestamp: 0,
            path: Some("/".to_string()),
            status,
            size: Some(10),
            referrer: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.add_requests(&[request(200), request(404)]).unwrap();
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: NormalizedRequest = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second, request(404));
    }

    #[test]
    fn test_text_sink() {
        let mut out = Vec::new();
        TextSink::new(&mut out).add_requests(&[request(301)]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "- 0.0.0.1 - 0 / 301 10 - \"-\"\n");
    }
}
