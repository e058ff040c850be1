//! codesieve CLI
//!
//! Quality filtering for source-code training corpora

mod config;
mod progress;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use codesieve_core::{filter_corpus, load_corpus, persist, AnnotatedRecord, PersistOutcome};
use codesieve_filters::CommentRatio;
use codesieve_formats::{open_corpus, Destination, ShardFormat, ShardedWriter};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

use config::RunConfig;
use progress::{EvaluationProgress, OutputState};

#[derive(Parser)]
#[command(name = "codesieve")]
#[command(version, about = "Quality filtering for source-code corpora", long_about = None)]
#[command(author = "codesieve")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output statistics in JSON format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the basic, stars and comment filters and save accepted records as shards
    Filter(FilterArgs),

    /// Write a config file with every default filled in
    InitConfig {
        /// Destination file (YAML or TOML)
        #[arg(value_name = "FILE")]
        output: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Input corpus: a JSONL/Parquet file or a directory of them
    #[arg(short, long)]
    input: PathBuf,

    /// Root output directory
    #[arg(short, long)]
    out_path: PathBuf,

    /// Subset name; shards go to <out-path>/<subset>
    #[arg(short, long)]
    subset: Option<String>,

    /// Config file with filter and output settings (YAML or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum line length allowed
    #[arg(long)]
    line_max: Option<i64>,

    /// Maximum mean line length allowed
    #[arg(long)]
    line_mean: Option<f64>,

    /// Minimum fraction of alphanumeric characters allowed
    #[arg(long)]
    alpha_frac: Option<f64>,

    /// Minimum number of stars for a file to be kept
    #[arg(long)]
    threshold_stars: Option<i64>,

    /// Minimum comment-to-code ratio
    #[arg(long)]
    min_threshold_comments: Option<f64>,

    /// Maximum comment-to-code ratio
    #[arg(long)]
    max_threshold_comments: Option<f64>,

    /// Number of worker threads
    #[arg(long)]
    num_workers: Option<usize>,

    /// Shard encoding
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Upper bound on content bytes per shard
    #[arg(long)]
    max_shard_bytes: Option<u64>,

    /// Also write rejected records, with their diagnostics, to this JSONL file
    #[arg(long)]
    rejected_output: Option<PathBuf>,

    /// Append logs to this file in addition to stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Show statistics without writing output
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Parquet,
    Jsonl,
}

impl From<FormatArg> for ShardFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Parquet => ShardFormat::Parquet,
            FormatArg::Jsonl => ShardFormat::Jsonl,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Filter(args) => args.log_file.as_deref(),
        _ => None,
    };
    init_logging(cli.verbose, cli.json, log_file)?;

    match cli.command {
        Commands::Filter(args) => run_filter(args, cli.json).await?,
        Commands::InitConfig { output } => {
            RunConfig::default().save(&output)?;
            info!("Wrote default config to {:?}", output);
        }
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool, log_file: Option<&Path>) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = builder
                .with_ansi(!json)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// File settings first, then any flag given on the command line
fn resolve_config(args: &FilterArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    let filters = &mut config.filters;
    if let Some(v) = args.line_max {
        filters.line_max = v;
    }
    if let Some(v) = args.line_mean {
        filters.line_mean = v;
    }
    if let Some(v) = args.alpha_frac {
        filters.alpha_frac = v;
    }
    if let Some(v) = args.threshold_stars {
        filters.threshold_stars = v;
    }
    if let Some(v) = args.min_threshold_comments {
        filters.min_threshold_comments = v;
    }
    if let Some(v) = args.max_threshold_comments {
        filters.max_threshold_comments = v;
    }
    if let Some(v) = args.num_workers {
        filters.num_workers = v;
    }
    if let Some(v) = args.format {
        config.output.format = v.into();
    }
    if let Some(v) = args.max_shard_bytes {
        config.output.max_shard_bytes = v;
    }

    config.filters.validate()?;
    if config.output.max_shard_bytes == 0 {
        anyhow::bail!("max_shard_bytes must be greater than zero");
    }
    Ok(config)
}

async fn run_filter(args: FilterArgs, json_output: bool) -> Result<()> {
    info!("** Job started with arguments: **\n{:#?}\n ****", args);
    let config = resolve_config(&args)?;
    info!("Effective configuration: {:?}", config);

    info!("=== Loading dataset ===");
    let start = Instant::now();
    let mut reader = open_corpus(&args.input)
        .with_context(|| format!("Failed to open corpus: {}", args.input.display()))?;
    let bar = progress::loading_bar(reader.total_bytes(), json_output);
    let rows = std::iter::from_fn(|| {
        let row = reader.next();
        bar.set_position(reader.bytes_processed());
        row
    });
    let corpus = load_corpus(rows)?;
    bar.finish_and_clear();
    info!(
        "Dataset loaded in {:.2} seconds",
        start.elapsed().as_secs_f64()
    );
    info!("Dataset: {} records", corpus.records.len());

    let evaluation = EvaluationProgress::new(corpus.records.len() as u64, json_output);
    let outcome = filter_corpus(
        corpus.records,
        &config.filters,
        &CommentRatio::new(),
        Some(&evaluation),
    )?;
    evaluation.finish();

    if let Some(path) = &args.rejected_output {
        write_rejected(path, &outcome.rejected)?;
    }

    let destination = Destination::new(&args.out_path, args.subset.clone());
    let saved = if args.dry_run {
        info!("Dry run: skipping save to {:?}", destination.dir());
        None
    } else {
        let writer = ShardedWriter::new(config.output.format, config.output.max_shard_bytes);
        Some(persist(&outcome.accepted, &destination, &writer)?)
    };

    if json_output {
        let (status, shards) = match &saved {
            Some(PersistOutcome::Saved(manifest)) => ("saved", manifest.files.clone()),
            Some(PersistOutcome::SkippedExisting(_)) => ("skipped_existing", Vec::new()),
            None => ("dry_run", Vec::new()),
        };
        let report = serde_json::json!({
            "input": args.input.to_string_lossy().to_string(),
            "output": destination.dir().to_string_lossy().to_string(),
            "status": status,
            "shards": shards,
            "rejected_output": args.rejected_output,
            "stats": outcome.stats,
            "dry_run": args.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let dir = destination.dir();
        let state = match &saved {
            Some(PersistOutcome::Saved(manifest)) => OutputState::Saved(&dir, manifest.files.len()),
            Some(PersistOutcome::SkippedExisting(_)) => OutputState::Existing(&dir),
            None => OutputState::DryRun,
        };
        progress::print_summary_report(&args.input, state, &outcome.stats);
    }

    info!("=== Processing completed successfully ===");
    Ok(())
}

/// One JSON object per rejected record, diagnostics included
fn write_rejected(path: &Path, rejected: &[AnnotatedRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create rejected output: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for annotated in rejected {
        let row = annotated.to_output()?;
        serde_json::to_writer(&mut writer, &row.data)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!("Wrote {} rejected records to {:?}", rejected.len(), path);
    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}
