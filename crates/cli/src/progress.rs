//! Progress reporting and visualization for CLI

use std::path::Path;

use codesieve_core::stats::Pct;
use codesieve_core::{CorpusStats, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_CHARS: &str = "█▓▒░-";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(BAR_CHARS)
}

/// Bar tracking bytes read while loading the corpus
pub fn loading_bar(total_bytes: Option<u64>, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    match total_bytes {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(style(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            ));
            bar
        }
        None => ProgressBar::new_spinner(),
    }
}

/// Record-based bar fed by the filter workers
pub struct EvaluationProgress {
    bar: ProgressBar,
}

impl EvaluationProgress {
    pub fn new(total_records: u64, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_records)
        };
        bar.set_style(style(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} ({per_sec}) {msg}",
        ));
        bar.set_message("Evaluating...");
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Complete!");
    }
}

impl ProgressSink for EvaluationProgress {
    fn advance(&self, records: u64) {
        self.bar.inc(records);
    }
}

/// Where the accepted corpus ended up
pub enum OutputState<'a> {
    Saved(&'a Path, usize),
    Existing(&'a Path),
    DryRun,
}

/// Print a formatted summary report
pub fn print_summary_report(input: &Path, output: OutputState<'_>, stats: &CorpusStats) {
    println!("\n{}", "═".repeat(60));
    println!("Corpus Filtering Complete");
    println!("{}", "═".repeat(60));
    println!("Input:              {}", input.display());

    match output {
        OutputState::Saved(dir, shards) => {
            println!("Output:             {} ({} shards)", dir.display(), shards)
        }
        OutputState::Existing(dir) => {
            println!("Output:             {} (already existed, not written)", dir.display())
        }
        OutputState::DryRun => println!("Output:             (dry run - no output written)"),
    }

    println!("Total records:      {}", format_with_commas(stats.initial_count));
    println!(
        "Rejected:           {} ({})",
        format_with_commas(stats.rejected_count()),
        Pct(stats.rejected_pct)
    );

    let gates = [
        ("max line length", stats.rejections.basic_max_line),
        ("avg line length", stats.rejections.basic_avg_line),
        ("alphanum fraction", stats.rejections.basic_alphanum),
        ("stars", stats.rejections.stars),
        ("comments", stats.rejections.comments),
    ];
    for (gate, count) in gates.iter().filter(|(_, count)| *count > 0) {
        println!("  {:<18}{}", format!("{}:", gate), format_with_commas(*count));
    }

    println!("Final dataset:      {}", format_with_commas(stats.final_count));
    println!(
        "Volume:             {} -> {} ({} removed)",
        format_bytes(stats.initial_bytes),
        format_bytes(stats.final_bytes),
        Pct(stats.size_reduction_pct)
    );
    println!("Filter time:        {:.2}s", stats.elapsed_secs);

    println!("{}", "═".repeat(60));
}

/// Format number with thousand separators
fn format_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Decimal byte units, matching the GB figures in the logs
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
