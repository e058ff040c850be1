//! Unified corpus reader abstraction
//!
//! Picks a reader from the file extension, and reads a directory as the
//! concatenation of its corpus files.

use crate::{jsonl::JsonlReader, parquet_reader::ParquetReader, Error, Record, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Common interface over corpus readers
pub trait DatasetReader: Iterator<Item = Result<Record>> {
    /// Total input size in bytes, if known
    fn total_bytes(&self) -> Option<u64>;

    /// Total number of records, if known from file metadata
    fn total_records(&self) -> Option<u64>;

    /// Bytes consumed so far
    fn bytes_processed(&self) -> u64;

    /// Records yielded so far
    fn records_processed(&self) -> usize;
}

impl DatasetReader for JsonlReader<Box<dyn std::io::Read>> {
    fn total_bytes(&self) -> Option<u64> {
        JsonlReader::total_bytes(self)
    }

    fn total_records(&self) -> Option<u64> {
        None
    }

    fn bytes_processed(&self) -> u64 {
        JsonlReader::bytes_processed(self)
    }

    fn records_processed(&self) -> usize {
        JsonlReader::records_processed(self)
    }
}

impl DatasetReader for ParquetReader {
    fn total_bytes(&self) -> Option<u64> {
        ParquetReader::total_bytes(self)
    }

    fn total_records(&self) -> Option<u64> {
        ParquetReader::total_records(self)
    }

    fn bytes_processed(&self) -> u64 {
        // Parquet has no byte cursor; estimate from the row fraction.
        match (self.total_bytes(), self.total_records()) {
            (Some(bytes), Some(rows)) => {
                (self.records_processed() as u64 * bytes) / rows.max(1)
            }
            _ => 0,
        }
    }

    fn records_processed(&self) -> usize {
        ParquetReader::records_processed(self)
    }
}

/// Whether `path` has an extension `open_dataset` understands
pub fn is_supported(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl" | "json" | "gz" | "parquet")
    )
}

/// Open a single corpus file with automatic format detection
///
/// Supported formats:
/// - `.jsonl`, `.json` - JSON Lines
/// - `.gz` - gzip-compressed JSON Lines
/// - `.parquet` - Apache Parquet
pub fn open_dataset<P: AsRef<Path>>(path: P) -> Result<Box<dyn DatasetReader>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::UnsupportedFormat("No file extension found".to_string()))?;

    debug!("Opening corpus file: {:?} (format: {})", path, extension);

    match extension {
        "jsonl" | "json" | "gz" => Ok(Box::new(JsonlReader::open(path)?)),
        "parquet" => Ok(Box::new(ParquetReader::open(path)?)),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported file extension: {}",
            extension
        ))),
    }
}

/// Open a corpus file, or every supported file in a directory
///
/// Directory entries are read in lexicographic order; unsupported files are
/// ignored. A directory without any corpus file is an error.
pub fn open_corpus<P: AsRef<Path>>(path: P) -> Result<Box<dyn DatasetReader>> {
    let path = path.as_ref();
    if !path.is_dir() {
        return open_dataset(path);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    files.retain(|p| p.is_file() && is_supported(p));
    files.sort();

    if files.is_empty() {
        return Err(Error::InvalidFile(format!(
            "no corpus files found in {}",
            path.display()
        )));
    }

    info!("Reading {} corpus files from {:?}", files.len(), path);
    Ok(Box::new(DirectoryReader::new(files)?))
}

/// Reads a list of corpus files back to back
pub struct DirectoryReader {
    remaining: VecDeque<PathBuf>,
    current: Option<Box<dyn DatasetReader>>,
    total_bytes: u64,
    finished_bytes: u64,
    finished_records: usize,
}

impl DirectoryReader {
    fn new(files: Vec<PathBuf>) -> Result<Self> {
        let mut total_bytes = 0;
        for file in &files {
            total_bytes += fs::metadata(file)?.len();
        }
        Ok(Self {
            remaining: files.into(),
            current: None,
            total_bytes,
            finished_bytes: 0,
            finished_records: 0,
        })
    }

    fn advance(&mut self) -> Option<Result<()>> {
        if let Some(done) = self.current.take() {
            self.finished_bytes += done.total_bytes().unwrap_or_else(|| done.bytes_processed());
            self.finished_records += done.records_processed();
        }
        let next = self.remaining.pop_front()?;
        Some(open_dataset(&next).map(|reader| self.current = Some(reader)))
    }
}

impl Iterator for DirectoryReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(Ok(mut record)) => {
                        // Positions are global across the directory.
                        record.position += self.finished_records;
                        return Some(Ok(record));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => {}
                }
            }
            if let Err(e) = self.advance()? {
                return Some(Err(e));
            }
        }
    }
}

impl DatasetReader for DirectoryReader {
    fn total_bytes(&self) -> Option<u64> {
        Some(self.total_bytes)
    }

    fn total_records(&self) -> Option<u64> {
        None
    }

    fn bytes_processed(&self) -> u64 {
        self.finished_bytes + self.current.as_ref().map_or(0, |r| r.bytes_processed())
    }

    fn records_processed(&self) -> usize {
        self.finished_records + self.current.as_ref().map_or(0, |r| r.records_processed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_jsonl(path: &Path, lines: &[&str]) {
        let mut file = fs::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    #[test]
    fn test_open_jsonl_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        write_jsonl(&path, &[r#"{"content": "a"}"#, r#"{"content": "b"}"#]);

        let mut reader = open_dataset(&path).unwrap();
        assert_eq!(reader.records_processed(), 0);

        let records: Vec<_> = reader.by_ref().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data["content"], "a");
        assert_eq!(reader.records_processed(), 2);
        assert!(reader.bytes_processed() > 0);
    }

    #[test]
    fn test_open_dataset_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        write_jsonl(&path, &[]);

        let result = open_dataset(&path);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_open_corpus_directory_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_jsonl(&dir.path().join("b.jsonl"), &[r#"{"content": "third"}"#]);
        write_jsonl(
            &dir.path().join("a.jsonl"),
            &[r#"{"content": "first"}"#, r#"{"content": "second"}"#],
        );
        write_jsonl(&dir.path().join("README.md"), &["not a corpus file"]);

        let mut reader = open_corpus(dir.path()).unwrap();
        let records: Vec<_> = reader.by_ref().collect::<Result<Vec<_>>>().unwrap();

        let contents: Vec<_> = records.iter().map(|r| r.data["content"].clone()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        let positions: Vec<_> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(reader.records_processed(), 3);
        assert_eq!(reader.bytes_processed(), reader.total_bytes().unwrap());
    }

    #[test]
    fn test_open_corpus_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(open_corpus(dir.path()), Err(Error::InvalidFile(_))));
    }
}
