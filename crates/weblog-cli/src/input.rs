// Log input: stdin or a file, decompressed by extension

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;
use xz2::read::XzDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("gz" | "gzip") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            Some("xz") => Self::Xz,
            _ => Self::None,
        }
    }
}

/// Wrap a raw byte source in the matching decoder. Rotated logs are often
/// concatenated archives, so multi-member gzip and bzip2 streams are read
/// to the end.
pub fn decoder<R: Read + 'static>(compression: Compression, inner: R) -> Box<dyn BufRead> {
    match compression {
        Compression::None => Box::new(BufReader::new(inner)),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(inner))),
        Compression::Bzip2 => Box::new(BufReader::new(MultiBzDecoder::new(inner))),
        Compression::Xz => Box::new(BufReader::new(XzDecoder::new(inner))),
    }
}

/// Open `-` as stdin, anything else as a possibly compressed file.
pub fn open_log(file: &str) -> io::Result<Box<dyn BufRead>> {
    if file == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }

    let path = Path::new(file);
    let compression = Compression::from_path(path);
    debug!(path = %path.display(), ?compression, "opening log");
    Ok(decoder(compression, File::open(path)?))
}
