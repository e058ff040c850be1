//! Parquet writer
//!
//! Records are buffered until `close()`, which infers the Arrow schema from
//! every buffered record and writes the rows in batches. A column's type
//! therefore reflects all of its values, not just the leading ones.
//! `close()` writes the footer and must be called for the file to be valid.

use crate::{Error, Record, Result};
use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_BATCH_SIZE: usize = 4096;

/// Parquet writer for one output file.
pub struct ParquetWriter {
    file: File,
    pending: Vec<Map<String, Value>>,
    batch_size: usize,
}

impl ParquetWriter {
    /// Create (truncating) a Parquet file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file,
            pending: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Buffer a record.
    ///
    /// Non-object records cannot be mapped to columns and are rejected.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let Value::Object(map) = &record.data else {
            return Err(Error::InvalidFile(format!(
                "record {} is not a JSON object",
                record.position
            )));
        };
        self.pending.push(map.clone());
        Ok(())
    }

    /// Infer the schema, write every buffered row and the parquet footer.
    ///
    /// Returns the number of rows written. With no rows the file still gets
    /// an empty schema and is readable.
    pub fn close(self) -> Result<usize> {
        let schema = infer_schema(&self.pending);
        debug!("Writing {} rows with schema {:?}", self.pending.len(), schema);

        let mut writer = ArrowWriter::try_new(self.file, schema.clone(), Some(props()))?;
        for chunk in self.pending.chunks(self.batch_size) {
            writer.write(&records_to_batch(chunk, &schema)?)?;
        }
        writer.close()?;
        Ok(self.pending.len())
    }
}

fn props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

/// Infer an Arrow schema from the union of keys in `records`, in first-seen order.
fn infer_schema(records: &[Map<String, Value>]) -> SchemaRef {
    let mut names: Vec<&String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.contains(&key) {
                names.push(key);
            }
        }
    }

    let fields: Vec<Field> = names
        .into_iter()
        .map(|name| Field::new(name, infer_field_type(records, name), true))
        .collect();

    Arc::new(Schema::new(fields))
}

/// Column type for a JSON field:
/// integers only → `Int64`, any non-integer number among numbers → `Float64`,
/// booleans only → `Boolean`, everything else (mixed kinds, strings, nested
/// values, all-null) → `Utf8`.
fn infer_field_type(records: &[Map<String, Value>], field: &str) -> DataType {
    let (mut ints, mut floats, mut bools, mut other) = (false, false, false, false);

    for record in records {
        match record.get(field) {
            Some(Value::Bool(_)) => bools = true,
            Some(Value::Number(n)) if n.is_i64() => ints = true,
            Some(Value::Number(_)) => floats = true,
            Some(Value::Null) | None => {}
            Some(_) => other = true,
        }
    }

    match (ints, floats, bools, other) {
        (_, true, false, false) => DataType::Float64,
        (true, false, false, false) => DataType::Int64,
        (false, false, true, false) => DataType::Boolean,
        _ => DataType::Utf8,
    }
}

fn records_to_batch(records: &[Map<String, Value>], schema: &SchemaRef) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = schema
        .fields()
        .iter()
        .map(|field| build_column(records, field.name(), field.data_type()))
        .collect();

    RecordBatch::try_new(schema.clone(), columns).map_err(Error::ArrowError)
}

fn build_column(records: &[Map<String, Value>], name: &str, dtype: &DataType) -> ArrayRef {
    let rows = records.len();
    match dtype {
        DataType::Boolean => {
            let mut b = BooleanBuilder::with_capacity(rows);
            for rec in records {
                b.append_option(rec.get(name).and_then(Value::as_bool));
            }
            Arc::new(b.finish())
        }
        DataType::Int64 => {
            let mut b = Int64Builder::with_capacity(rows);
            for rec in records {
                b.append_option(rec.get(name).and_then(Value::as_i64));
            }
            Arc::new(b.finish())
        }
        DataType::Float64 => {
            let mut b = Float64Builder::with_capacity(rows);
            for rec in records {
                b.append_option(rec.get(name).and_then(Value::as_f64));
            }
            Arc::new(b.finish())
        }
        _ => {
            let mut b = StringBuilder::with_capacity(rows, rows * 64);
            for rec in records {
                match rec.get(name) {
                    Some(Value::String(s)) => b.append_value(s),
                    Some(Value::Null) | None => b.append_null(),
                    Some(other) => b.append_value(other.to_string()),
                }
            }
            Arc::new(b.finish())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parquet_reader::ParquetReader;
    use serde_json::json;

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");

        let mut writer = ParquetWriter::open(&path).unwrap();
        writer
            .write_record(&Record::new(json!({"content": "a", "stars": 3, "nl_ratio": 0.25}), 0))
            .unwrap();
        writer
            .write_record(&Record::new(json!({"content": "b", "stars": 7, "nl_ratio": 0.5}), 1))
            .unwrap();
        assert_eq!(writer.close().unwrap(), 2);

        let records: Vec<_> = ParquetReader::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data["content"], "a");
        assert_eq!(records[1].data["stars"], 7);
        assert_eq!(records[1].data["nl_ratio"], 0.5);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");

        assert_eq!(ParquetWriter::open(&path).unwrap().close().unwrap(), 0);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PAR1"));
        assert!(bytes.ends_with(b"PAR1"));
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ParquetWriter::open(dir.path().join("x.parquet")).unwrap();
        let result = writer.write_record(&Record::new(json!([1, 2]), 9));
        assert!(matches!(result, Err(Error::InvalidFile(_))));
    }

    fn read_back(path: &Path) -> Vec<Record> {
        ParquetReader::open(path)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_late_values_keep_their_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.parquet");
        let rows = DEFAULT_BATCH_SIZE + 904;

        let mut writer = ParquetWriter::open(&path).unwrap();
        for i in 0..rows {
            let issues = if i < DEFAULT_BATCH_SIZE { Value::Null } else { json!(7) };
            let ratio = if i < DEFAULT_BATCH_SIZE { json!(1) } else { json!(0.5) };
            writer
                .write_record(&Record::new(
                    json!({"content": "x", "max_issues_count": issues, "ratio": ratio}),
                    i,
                ))
                .unwrap();
        }
        assert_eq!(writer.close().unwrap(), rows);

        let records = read_back(&path);
        assert_eq!(records.len(), rows);
        assert_eq!(records[0].data["max_issues_count"], Value::Null);
        assert_eq!(records[rows - 1].data["max_issues_count"], json!(7));
        assert_eq!(records[0].data["ratio"], json!(1.0));
        assert_eq!(records[rows - 1].data["ratio"], json!(0.5));
    }

    #[test]
    fn test_columns_first_seen_late_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.parquet");

        let mut writer = ParquetWriter::open(&path).unwrap();
        writer.write_record(&Record::new(json!({"content": "a"}), 0)).unwrap();
        writer
            .write_record(&Record::new(json!({"content": "b", "license": "mit"}), 1))
            .unwrap();
        writer.close().unwrap();

        let records = read_back(&path);
        assert_eq!(records[0].data["license"], Value::Null);
        assert_eq!(records[1].data["license"], "mit");
    }

    #[test]
    fn test_infer_field_type() {
        let records: Vec<Map<String, Value>> = vec![
            json!({"i": 1, "f": 1, "b": true, "s": "x", "n": null}),
            json!({"i": 2, "f": 0.5, "b": false, "s": 3}),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        assert_eq!(infer_field_type(&records, "i"), DataType::Int64);
        assert_eq!(infer_field_type(&records, "f"), DataType::Float64);
        assert_eq!(infer_field_type(&records, "b"), DataType::Boolean);
        assert_eq!(infer_field_type(&records, "s"), DataType::Utf8);
        assert_eq!(infer_field_type(&records, "n"), DataType::Utf8);
    }
}
