//! Sharded corpus output
//!
//! A run writes its output into `<out_path>/<subset>/` as a fixed number of
//! shard files. The directory itself marks a completed output: it is created
//! exclusively, so a second run against the same destination fails with
//! [`Error::AlreadyExists`] instead of overwriting.

use crate::{Error, ParquetWriter, Record, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default upper bound on the bytes of `content` per shard
pub const DEFAULT_MAX_SHARD_BYTES: u64 = 1 << 30;

/// Where a run's shards go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub out_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,
}

impl Destination {
    pub fn new(out_path: impl Into<PathBuf>, subset: Option<String>) -> Self {
        Self {
            out_path: out_path.into(),
            subset,
        }
    }

    /// Directory holding the shard files
    pub fn dir(&self) -> PathBuf {
        match &self.subset {
            Some(subset) => self.out_path.join(subset),
            None => self.out_path.clone(),
        }
    }
}

/// On-disk encoding of each shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardFormat {
    #[default]
    Parquet,
    Jsonl,
}

impl ShardFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ShardFormat::Parquet => "parquet",
            ShardFormat::Jsonl => "jsonl",
        }
    }
}

/// What a successful write produced
#[derive(Debug, Clone, Serialize)]
pub struct ShardManifest {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub records: usize,
    pub bytes: u64,
}

/// Persists a corpus as shard files.
///
/// Implementations must return [`Error::AlreadyExists`] when the destination
/// already holds output, and must not modify it in that case.
pub trait ShardWriter: Send + Sync {
    fn write_shards(&self, records: &[Record], destination: &Destination) -> Result<ShardManifest>;
}

/// Writes Parquet or JSONL shards of bounded size
#[derive(Debug, Clone)]
pub struct ShardedWriter {
    pub format: ShardFormat,
    pub max_shard_bytes: u64,
}

impl Default for ShardedWriter {
    fn default() -> Self {
        Self {
            format: ShardFormat::default(),
            max_shard_bytes: DEFAULT_MAX_SHARD_BYTES,
        }
    }
}

impl ShardedWriter {
    pub fn new(format: ShardFormat, max_shard_bytes: u64) -> Self {
        Self {
            format,
            max_shard_bytes: max_shard_bytes.max(1),
        }
    }

    /// Number of shards for a corpus of `total_bytes`; always at least one
    pub fn shard_count(&self, total_bytes: u64) -> usize {
        total_bytes.div_ceil(self.max_shard_bytes.max(1)).max(1) as usize
    }

    fn write_one(&self, path: &Path, records: &[Record]) -> Result<()> {
        match self.format {
            ShardFormat::Parquet => {
                let mut writer = ParquetWriter::open(path)?;
                for record in records {
                    writer.write_record(record)?;
                }
                writer.close()?;
                Ok(())
            }
            ShardFormat::Jsonl => {
                let mut writer = BufWriter::new(File::create(path)?);
                for record in records {
                    serde_json::to_writer(&mut writer, &record.data)?;
                    writer.write_all(b"\n")?;
                }
                writer.flush()?;
                Ok(())
            }
        }
    }
}

/// Split `records` into `shards` contiguous, near-equal runs
fn split_even(records: &[Record], shards: usize) -> impl Iterator<Item = &[Record]> {
    let base = records.len() / shards;
    let extra = records.len() % shards;
    let mut start = 0;
    (0..shards).map(move |i| {
        let len = base + usize::from(i < extra);
        let chunk = &records[start..start + len];
        start += len;
        chunk
    })
}

impl ShardWriter for ShardedWriter {
    fn write_shards(&self, records: &[Record], destination: &Destination) -> Result<ShardManifest> {
        let dir = destination.dir();
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(Error::AlreadyExists(dir)),
            Err(e) => return Err(e.into()),
        }

        let bytes: u64 = records.iter().map(Record::byte_size).sum();
        // Never more shards than records, so no shard file is empty.
        let shards = self.shard_count(bytes).min(records.len().max(1));
        info!(
            "Writing {} records ({} bytes) as {} {} shard(s) to {:?}",
            records.len(),
            bytes,
            shards,
            self.format.extension(),
            dir
        );

        let mut files = Vec::with_capacity(shards);
        for (index, chunk) in split_even(records, shards).enumerate() {
            let path = dir.join(format!(
                "data-{:05}-of-{:05}.{}",
                index,
                shards,
                self.format.extension()
            ));
            debug!("Writing shard {:?} ({} records)", path, chunk.len());
            self.write_one(&path, chunk)?;
            files.push(path);
        }

        Ok(ShardManifest {
            dir,
            files,
            records: records.len(),
            bytes,
        })
    }
}
