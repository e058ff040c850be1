//! Typed view of a corpus row

use crate::{Error, Result};
use codesieve_formats::Record;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// One source file of the corpus.
///
/// Columns the filter does not look at are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub content: String,
    #[serde(rename = "lang", alias = "language")]
    pub language: String,
    #[serde(deserialize_with = "whole_number::required")]
    pub max_line_length: i64,
    pub avg_line_length: f64,
    pub alphanum_fraction: f64,
    /// Null and missing both mean "no star data"
    #[serde(default, deserialize_with = "whole_number::optional")]
    pub max_stars_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Position in the input, for error messages and output records
    #[serde(skip)]
    pub position: usize,
}

impl CodeRecord {
    /// Decode a raw corpus row
    pub fn from_record(record: Record) -> Result<Self> {
        let position = record.position;
        let mut typed: CodeRecord = serde_json::from_value(record.data)
            .map_err(|source| Error::InvalidRecord { position, source })?;
        typed.position = position;
        Ok(typed)
    }

    /// Fill in `size` from the content length. Returns whether it was missing.
    pub fn ensure_size(&mut self) -> bool {
        if self.size.is_some() {
            return false;
        }
        self.size = Some(self.content.len() as u64);
        true
    }

    /// Size in bytes, as recorded or derived from the content
    pub fn byte_size(&self) -> u64 {
        self.size.unwrap_or(self.content.len() as u64)
    }
}

/// Integer columns that may arrive as floats (`12.0`) when the exporter
/// widened a nullable column. Fractional values are still rejected.
mod whole_number {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Number;

    fn to_i64<E: Error>(n: &Number) -> Result<i64, E> {
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
        match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(E::custom(format!("expected a whole number, found {}", n))),
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        to_i64(&Number::deserialize(deserializer)?)
    }

    pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Option::<Number>::deserialize(deserializer)?
            .map(|n| to_i64(&n))
            .transpose()
    }
}

/// A fully loaded corpus
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub records: Vec<CodeRecord>,
    /// How many records had no `size` column
    pub sizes_derived: usize,
}

/// Read every row from `source`, decode it and make sure it carries a size.
///
/// A row that cannot be read or lacks a required column fails the load.
pub fn load_corpus<I>(source: I) -> Result<LoadedCorpus>
where
    I: IntoIterator<Item = codesieve_formats::Result<Record>>,
{
    let mut corpus = LoadedCorpus::default();
    for row in source {
        let mut record = CodeRecord::from_record(row?)?;
        if record.ensure_size() {
            corpus.sizes_derived += 1;
        }
        corpus.records.push(record);
    }

    if corpus.sizes_derived > 0 {
        info!("Added size column to {} records", corpus.sizes_derived);
    }
    Ok(corpus)
}
