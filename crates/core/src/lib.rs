//! Combined quality filtering for source-code corpora
//!
//! Records pass through three gates (basic shape, stars, comment density)
//! in a single parallel pass. Every record keeps its diagnostics; accepted
//! records are then persisted as shards, unless a previous run already
//! produced the output.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod persist;
pub mod record;
pub mod stage;
pub mod stats;

pub use config::FilterConfig;
pub use error::{Error, Result};
pub use evaluate::{annotate, evaluate, AnnotatedRecord, BasicRejection, Diagnostics};
pub use persist::{persist, PersistOutcome};
pub use record::{load_corpus, CodeRecord, LoadedCorpus};
pub use stage::{filter_corpus, FilterOutcome, ProgressSink};
pub use stats::{CorpusStats, RejectionCounts};
