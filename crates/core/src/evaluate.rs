//! Per-record quality gates
//!
//! A record goes through three independent gates:
//!
//! 1. **Basic**: longest line, mean line length, alphanumeric fraction.
//!    Checked in that order; only the first failing check is recorded.
//! 2. **Stars**: repository star count, missing counts as zero.
//! 3. **Comments**: comment density from a [`CommentDensity`] oracle.
//!
//! All three always run, so a rejected record still carries the full set of
//! measurements. The record is accepted only if no gate failed.

use crate::{CodeRecord, FilterConfig, Result};
use codesieve_filters::CommentDensity;
use codesieve_formats::Record;
use serde::Serialize;
use serde_json::{Map, Value};

/// Which basic check rejected a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicRejection {
    MaxLine,
    AvgLine,
    Alphanum,
}

impl BasicRejection {
    /// Column name used in output records
    pub fn tag(self) -> &'static str {
        match self {
            BasicRejection::MaxLine => "basic_rejected_max_line",
            BasicRejection::AvgLine => "basic_rejected_avg_line",
            BasicRejection::Alphanum => "basic_rejected_alphanum",
        }
    }
}

type BasicCheck = fn(&CodeRecord, &FilterConfig) -> bool;

fn line_too_long(record: &CodeRecord, config: &FilterConfig) -> bool {
    record.max_line_length > config.line_max
}

fn mean_line_too_long(record: &CodeRecord, config: &FilterConfig) -> bool {
    record.avg_line_length > config.line_mean
}

fn too_few_alphanumerics(record: &CodeRecord, config: &FilterConfig) -> bool {
    record.alphanum_fraction < config.alpha_frac
}

/// Basic checks in evaluation order; the first failure wins.
const BASIC_GATE: [(BasicRejection, BasicCheck); 3] = [
    (BasicRejection::MaxLine, line_too_long),
    (BasicRejection::AvgLine, mean_line_too_long),
    (BasicRejection::Alphanum, too_few_alphanumerics),
];

/// Every column `Diagnostics::write_columns` may produce
pub const DIAGNOSTIC_COLUMNS: [&str; 8] = [
    "stars",
    "nl_ratio",
    "basic_rejected_max_line",
    "basic_rejected_avg_line",
    "basic_rejected_alphanum",
    "stars_rejected",
    "comments_rejected",
    "accepted",
];

/// Gate outcomes for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Star count, zero when the record had none
    pub stars: i64,
    /// Comment density as scored by the oracle
    pub nl_ratio: f64,
    pub basic_rejection: Option<BasicRejection>,
    pub stars_rejected: bool,
    pub comments_rejected: bool,
    pub accepted: bool,
}

impl Diagnostics {
    /// Names of the rejection tags set on this record
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::with_capacity(3);
        if let Some(basic) = self.basic_rejection {
            tags.push(basic.tag());
        }
        if self.stars_rejected {
            tags.push("stars_rejected");
        }
        if self.comments_rejected {
            tags.push("comments_rejected");
        }
        tags
    }

    /// Add the diagnostic columns to an output row.
    ///
    /// Diagnostic columns already in the row (e.g. from a previous run's
    /// output) are removed first. `stars`, `nl_ratio` and `accepted` are
    /// always written; each tag that is set becomes a column holding `1`.
    pub fn write_columns(&self, row: &mut Map<String, Value>) {
        for column in DIAGNOSTIC_COLUMNS {
            row.remove(column);
        }
        row.insert("stars".to_string(), Value::from(self.stars));
        row.insert("nl_ratio".to_string(), Value::from(self.nl_ratio));
        for tag in self.tags() {
            row.insert(tag.to_string(), Value::from(1));
        }
        row.insert("accepted".to_string(), Value::from(u8::from(self.accepted)));
    }
}

/// Run all three gates on `record`.
///
/// Pure: the same record and config always give the same diagnostics, and
/// calls may run concurrently.
pub fn evaluate(
    record: &CodeRecord,
    config: &FilterConfig,
    oracle: &dyn CommentDensity,
) -> Diagnostics {
    let mut valid = true;

    let basic_rejection = BASIC_GATE
        .iter()
        .find(|(_, fails)| fails(record, config))
        .map(|(tag, _)| *tag);
    if basic_rejection.is_some() {
        valid = false;
    }

    let stars = record.max_stars_count.unwrap_or(0);
    let stars_rejected = stars <= config.threshold_stars;
    if stars_rejected {
        valid = false;
    }

    let nl_ratio = oracle.ratio(&record.content, &record.language.to_lowercase());
    let nl_ratio = if nl_ratio.is_finite() { nl_ratio } else { 0.0 };
    let comments_rejected =
        nl_ratio <= config.min_threshold_comments || nl_ratio >= config.max_threshold_comments;
    if comments_rejected {
        valid = false;
    }

    Diagnostics {
        stars,
        nl_ratio,
        basic_rejection,
        stars_rejected,
        comments_rejected,
        accepted: valid,
    }
}

/// A record together with its diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub record: CodeRecord,
    pub diagnostics: Diagnostics,
}

impl AnnotatedRecord {
    /// Output row: the record's columns followed by the diagnostic columns
    pub fn to_output(&self) -> Result<Record> {
        let mut row = match serde_json::to_value(&self.record)? {
            Value::Object(map) => map,
            _ => unreachable!("CodeRecord serializes to a JSON object"),
        };
        self.diagnostics.write_columns(&mut row);
        Ok(Record::new(Value::Object(row), self.record.position))
    }
}

/// Evaluate `record` and attach the diagnostics
pub fn annotate(
    record: CodeRecord,
    config: &FilterConfig,
    oracle: &dyn CommentDensity,
) -> AnnotatedRecord {
    let diagnostics = evaluate(&record, config, oracle);
    AnnotatedRecord {
        record,
        diagnostics,
    }
}
