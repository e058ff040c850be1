//! Guarded persistence of the accepted corpus
//!
//! Output is written at most once per destination. If the destination
//! already holds a previous run's shards, nothing is written and the run
//! still succeeds.

use crate::{AnnotatedRecord, Result};
use codesieve_formats::{Destination, Error as FormatError, Record, ShardManifest, ShardWriter};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// What happened to the accepted corpus
#[derive(Debug)]
pub enum PersistOutcome {
    Saved(ShardManifest),
    /// The directory already existed and was left untouched
    SkippedExisting(PathBuf),
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistOutcome::Saved(_))
    }
}

/// Write `accepted` to `destination` through `writer`, unless a previous
/// output is already there.
///
/// Writer failures other than "already exists" are returned as errors.
pub fn persist(
    accepted: &[AnnotatedRecord],
    destination: &Destination,
    writer: &dyn ShardWriter,
) -> Result<PersistOutcome> {
    let dir = destination.dir();
    info!("=== Streaming filtered dataset to disk ===");

    if dir.exists() {
        warn!("Output dir already exists at {:?}. Will not save filtered data", dir);
        return Ok(PersistOutcome::SkippedExisting(dir));
    }

    let start = Instant::now();
    let rows = accepted
        .iter()
        .map(AnnotatedRecord::to_output)
        .collect::<Result<Vec<Record>>>()?;

    match writer.write_shards(&rows, destination) {
        Ok(manifest) => {
            info!(
                "Dataset successfully saved at {:?} ({} shards) in {:.2} seconds",
                manifest.dir,
                manifest.files.len(),
                start.elapsed().as_secs_f64()
            );
            Ok(PersistOutcome::Saved(manifest))
        }
        Err(FormatError::AlreadyExists(existing)) => {
            warn!(
                "Output dir already exists at {:?}. Will not save filtered data",
                existing
            );
            Ok(PersistOutcome::SkippedExisting(existing))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample;
    use crate::{annotate, Error, FilterConfig};
    use codesieve_filters::CommentDensity;
    use codesieve_formats::{open_corpus, ShardFormat, ShardedWriter};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Half;

    impl CommentDensity for Half {
        fn ratio(&self, _content: &str, _language: &str) -> f64 {
            0.5
        }
    }

    /// Writer that counts calls and replies with a canned result
    struct Scripted {
        calls: AtomicUsize,
        reply: fn(&Destination) -> codesieve_formats::Result<ShardManifest>,
    }

    impl Scripted {
        fn new(reply: fn(&Destination) -> codesieve_formats::Result<ShardManifest>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    impl ShardWriter for Scripted {
        fn write_shards(
            &self,
            _records: &[Record],
            destination: &Destination,
        ) -> codesieve_formats::Result<ShardManifest> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(destination)
        }
    }

    fn accepted() -> Vec<AnnotatedRecord> {
        (0..4)
            .map(|i| {
                let mut record = sample(&format!("x = {}", i), Some(10));
                record.position = i;
                annotate(record, &FilterConfig::default(), &Half)
            })
            .collect()
    }

    #[test]
    fn test_saves_to_fresh_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(tmp.path().join("out"), Some("python".to_string()));
        let writer = ShardedWriter::new(ShardFormat::Jsonl, 1 << 20);

        let outcome = persist(&accepted(), &dest, &writer).unwrap();
        assert!(outcome.is_saved());

        let rows: Vec<_> = open_corpus(dest.dir())
            .unwrap()
            .collect::<codesieve_formats::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].data["content"], "x = 3");
        assert_eq!(rows[0].data["accepted"], 1);
        assert_eq!(rows[0].data["nl_ratio"], 0.5);
    }

    #[test]
    fn test_existing_destination_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(tmp.path(), Some("python".to_string()));
        fs::create_dir(dest.dir()).unwrap();

        let writer = Scripted::new(|_| panic!("writer must not be called"));
        let records = accepted();
        let before = records.clone();

        let outcome = persist(&records, &dest, &writer).unwrap();
        assert!(matches!(outcome, PersistOutcome::SkippedExisting(ref p) if *p == dest.dir()));
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(records, before);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(tmp.path(), Some("go".to_string()));
        let writer = ShardedWriter::new(ShardFormat::Jsonl, 1 << 20);

        assert!(persist(&accepted(), &dest, &writer).unwrap().is_saved());
        let first: Vec<_> = fs::read_dir(dest.dir()).unwrap().collect();

        let outcome = persist(&accepted()[..1], &dest, &writer).unwrap();
        assert!(!outcome.is_saved());
        let second: Vec<_> = fs::read_dir(dest.dir()).unwrap().collect();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn test_already_exists_signal_is_translated() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(tmp.path(), Some("raced".to_string()));
        let writer = Scripted::new(|d| Err(FormatError::AlreadyExists(d.dir())));

        let outcome = persist(&accepted(), &dest, &writer).unwrap();
        assert!(matches!(outcome, PersistOutcome::SkippedExisting(_)));
        assert_eq!(writer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_other_writer_errors_are_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = Destination::new(tmp.path(), Some("broken".to_string()));
        let writer = Scripted::new(|_| {
            Err(FormatError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        });

        let result = persist(&accepted(), &dest, &writer);
        assert!(matches!(result, Err(Error::Format(FormatError::Io(_)))));
    }
}
