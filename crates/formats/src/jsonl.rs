//! Streaming JSONL (JSON Lines) corpus reader
//!
//! Reads one record per line, transparently decompressing `.gz` files.

use crate::{Error, Record, Result};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Buffer size for the underlying BufReader
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming JSONL reader that processes files line-by-line
pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    records_read: usize,
    bytes_read: u64,
    total_bytes: Option<u64>,
}

impl JsonlReader<Box<dyn Read>> {
    /// Open a JSONL file, auto-detecting gzip compression
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let total_bytes = file.metadata()?.len();

        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => {
                debug!("Opening gzip-compressed JSONL file: {:?}", path);
                let reader: Box<dyn Read> = Box::new(GzDecoder::new(file));
                // Decompressed size is unknown up front.
                Ok(Self::with_total(reader, None))
            }
            _ => {
                debug!("Opening plain JSONL file: {:?}", path);
                let reader: Box<dyn Read> = Box::new(file);
                Ok(Self::with_total(reader, Some(total_bytes)))
            }
        }
    }
}

impl<R: Read> JsonlReader<R> {
    /// Create a new JSONL reader from any Read source
    pub fn new(reader: R) -> Self {
        Self::with_total(reader, None)
    }

    fn with_total(reader: R, total_bytes: Option<u64>) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, reader),
            line_number: 0,
            records_read: 0,
            bytes_read: 0,
            total_bytes,
        }
    }

    /// Number of lines consumed, including blank and malformed ones
    pub fn lines_processed(&self) -> usize {
        self.line_number
    }

    /// Number of records yielded
    pub fn records_processed(&self) -> usize {
        self.records_read
    }

    /// Number of (decompressed) bytes read
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_read
    }

    /// Total file size if known
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }
}

impl<R: Read> Iterator for JsonlReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(n) => {
                    self.bytes_read += n as u64;
                    self.line_number += 1;

                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(value) => {
                            let record = Record::new(value, self.records_read);
                            self.records_read += 1;
                            return Some(Ok(record));
                        }
                        Err(e) => {
                            // Malformed lines are skipped, not fatal.
                            warn!("Skipping malformed JSON at line {}: {}", self.line_number, e);
                            continue;
                        }
                    }
                }
                Err(e) => return Some(Err(Error::Io(e))),
            }
        }
    }
}
