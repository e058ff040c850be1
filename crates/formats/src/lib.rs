//! Corpus readers and writers for codesieve
//!
//! This crate provides streaming readers for JSONL, gzip JSONL and Parquet
//! corpora, and the sharded writer used to persist filtered output.

pub mod error;
pub mod jsonl;
pub mod parquet_reader;
pub mod parquet_writer;
pub mod reader;
pub mod record;
pub mod shard;

pub use error::{Error, Result};
pub use parquet_writer::ParquetWriter;
pub use reader::{open_corpus, open_dataset, DatasetReader};
pub use record::Record;
pub use shard::{Destination, ShardFormat, ShardManifest, ShardWriter, ShardedWriter};
