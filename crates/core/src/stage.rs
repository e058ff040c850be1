//! Corpus filter stage
//!
//! Annotates every record in parallel on a dedicated Rayon pool, then splits
//! the corpus into accepted and rejected records. Both halves keep the input
//! order and their diagnostics.

use crate::evaluate::annotate;
use crate::stats::{CorpusStats, RejectionCounts};
use crate::{AnnotatedRecord, CodeRecord, FilterConfig, Result};
use codesieve_filters::CommentDensity;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Receives per-record progress from the worker threads
pub trait ProgressSink: Send + Sync {
    fn advance(&self, records: u64);
}

/// Result of filtering a corpus
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub accepted: Vec<AnnotatedRecord>,
    pub rejected: Vec<AnnotatedRecord>,
    pub stats: CorpusStats,
}

/// Evaluate every record of `corpus` and keep the accepted ones.
///
/// Evaluation runs on `config.num_workers` threads. All records are scored
/// before any statistics are computed.
pub fn filter_corpus(
    corpus: Vec<CodeRecord>,
    config: &FilterConfig,
    oracle: &dyn CommentDensity,
    progress: Option<&dyn ProgressSink>,
) -> Result<FilterOutcome> {
    config.validate()?;
    let start = Instant::now();

    info!("=== Applying combined filters (basic, stars, comments) ===");
    info!(
        "- Basic: line_max={}, line_mean={}, alpha_frac={}",
        config.line_max, config.line_mean, config.alpha_frac
    );
    info!("- Stars: threshold={}", config.threshold_stars);
    info!(
        "- Comments: min={}, max={}",
        config.min_threshold_comments, config.max_threshold_comments
    );

    let initial_count = corpus.len();
    let initial_bytes: u64 = corpus.iter().map(CodeRecord::byte_size).sum();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_workers)
        .thread_name(|i| format!("codesieve-worker-{}", i))
        .build()?;
    debug!("Evaluating {} records on {} workers", initial_count, config.num_workers);

    // Indexed collect keeps input order regardless of scheduling.
    let annotated: Vec<AnnotatedRecord> = pool.install(|| {
        corpus
            .into_par_iter()
            .map(|record| {
                let annotated = annotate(record, config, oracle);
                if let Some(progress) = progress {
                    progress.advance(1);
                }
                annotated
            })
            .collect()
    });

    let rejections = RejectionCounts::tally(&annotated);
    let (accepted, rejected): (Vec<_>, Vec<_>) =
        annotated.into_iter().partition(|r| r.diagnostics.accepted);

    let final_bytes: u64 = accepted.iter().map(|r| r.record.byte_size()).sum();
    let stats = CorpusStats::new(initial_count, initial_bytes, accepted.len(), final_bytes)
        .with_rejections(rejections)
        .with_elapsed(start.elapsed());
    stats.log();

    Ok(FilterOutcome {
        accepted,
        rejected,
        stats,
    })
}
