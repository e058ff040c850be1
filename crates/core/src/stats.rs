//! Corpus-level statistics

use crate::AnnotatedRecord;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

const BYTES_PER_GB: f64 = 1e9;

/// Rejections per gate. A record rejected by several gates counts once in each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectionCounts {
    pub basic_max_line: usize,
    pub basic_avg_line: usize,
    pub basic_alphanum: usize,
    pub stars: usize,
    pub comments: usize,
}

impl RejectionCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a AnnotatedRecord>) -> Self {
        use crate::BasicRejection::*;

        let mut counts = Self::default();
        for annotated in records {
            let d = &annotated.diagnostics;
            match d.basic_rejection {
                Some(MaxLine) => counts.basic_max_line += 1,
                Some(AvgLine) => counts.basic_avg_line += 1,
                Some(Alphanum) => counts.basic_alphanum += 1,
                None => {}
            }
            counts.stars += usize::from(d.stars_rejected);
            counts.comments += usize::from(d.comments_rejected);
        }
        counts
    }
}

/// Before/after size of the corpus.
///
/// The percentages are `None` when the corpus (or its byte total) was empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub initial_count: usize,
    pub initial_bytes: u64,
    pub final_count: usize,
    pub final_bytes: u64,
    pub rejected_pct: Option<f64>,
    pub size_reduction_pct: Option<f64>,
    pub rejections: RejectionCounts,
    pub elapsed_secs: f64,
}

/// `part * 100 / whole`, undefined for an empty whole
fn percentage(part: f64, whole: f64) -> Option<f64> {
    (whole != 0.0).then(|| part * 100.0 / whole)
}

impl CorpusStats {
    pub fn new(initial_count: usize, initial_bytes: u64, final_count: usize, final_bytes: u64) -> Self {
        Self {
            initial_count,
            initial_bytes,
            final_count,
            final_bytes,
            rejected_pct: percentage(
                initial_count.saturating_sub(final_count) as f64,
                initial_count as f64,
            ),
            size_reduction_pct: percentage(
                initial_bytes.saturating_sub(final_bytes) as f64,
                initial_bytes as f64,
            ),
            ..Default::default()
        }
    }

    pub fn with_rejections(mut self, rejections: RejectionCounts) -> Self {
        self.rejections = rejections;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_secs = elapsed.as_secs_f64();
        self
    }

    pub fn rejected_count(&self) -> usize {
        self.initial_count - self.final_count
    }

    pub fn log(&self) {
        info!("Filtering completed in {:.2} seconds", self.elapsed_secs);
        info!(
            "Dataset size before filtering: {} examples, {:.2} GB",
            self.initial_count,
            self.initial_bytes as f64 / BYTES_PER_GB
        );
        info!(
            "Dataset size after filtering: {} examples, {:.2} GB",
            self.final_count,
            self.final_bytes as f64 / BYTES_PER_GB
        );
        info!("Percentage of removed files: {}", Pct(self.rejected_pct));
        info!("Percentage of volume removed: {}", Pct(self.size_reduction_pct));
        info!(
            "Rejections by gate: max_line={} avg_line={} alphanum={} stars={} comments={}",
            self.rejections.basic_max_line,
            self.rejections.basic_avg_line,
            self.rejections.basic_alphanum,
            self.rejections.stars,
            self.rejections.comments
        );
    }
}

/// Percentage display, `n/a` when undefined
pub struct Pct(pub Option<f64>);

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pct) => write!(f, "{:.2}%", pct),
            None => f.write_str("n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages() {
        let stats = CorpusStats::new(200, 1_000, 150, 600);
        assert_eq!(stats.rejected_pct, Some(25.0));
        assert_eq!(stats.size_reduction_pct, Some(40.0));
        assert_eq!(stats.rejected_count(), 50);
    }

    #[test]
    fn test_percentages_match_formula() {
        let (ic, ib, fc, fb) = (7usize, 999u64, 3usize, 412u64);
        let stats = CorpusStats::new(ic, ib, fc, fb);
        assert_eq!(stats.rejected_pct, Some((ic - fc) as f64 * 100.0 / ic as f64));
        assert_eq!(stats.size_reduction_pct, Some((ib - fb) as f64 * 100.0 / ib as f64));
    }

    #[test]
    fn test_empty_corpus_is_undefined() {
        let stats = CorpusStats::new(0, 0, 0, 0);
        assert_eq!(stats.rejected_pct, None);
        assert_eq!(stats.size_reduction_pct, None);

        let zero_bytes = CorpusStats::new(3, 0, 1, 0);
        assert!(zero_bytes.rejected_pct.is_some());
        assert_eq!(zero_bytes.size_reduction_pct, None);
    }

    #[test]
    fn test_pct_display() {
        assert_eq!(Pct(Some(12.5)).to_string(), "12.50%");
        assert_eq!(Pct(None).to_string(), "n/a");
    }

    #[test]
    fn test_undefined_serializes_as_null() {
        let value = serde_json::to_value(CorpusStats::new(0, 0, 0, 0)).unwrap();
        assert!(value["rejected_pct"].is_null());
        assert!(value["size_reduction_pct"].is_null());
    }
}
