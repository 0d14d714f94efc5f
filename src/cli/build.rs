use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::info;

use crate::filter::builder::{build_filter, write_filter_file, FilterConfig};
use crate::io::files::resolve_inputs;

#[derive(Args, Debug)]
#[command(about = "Build a k-mer filter from sequence files")]
pub struct BuildArgs {
    /// Input sequence files or directories (FASTA/FASTQ, optionally gzipped)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output path for the filter artifact
    #[arg(short = 'o', long)]
    pub output: PathBuf,
    /// K-mer length
    #[arg(short = 'k', long)]
    pub klen: u32,
    /// Minimum occurrence count for a k-mer to be kept
    #[arg(short = 'c', long, default_value = "1")]
    pub min_count: u32,
    /// Keep low-complexity k-mers instead of dropping them
    #[arg(long)]
    pub keep_low_complexity: bool,
    /// Descend into sub-directories when an input is a directory
    #[arg(short = 'r', long)]
    pub recursive: bool,
    /// Number of scan threads (0 = all cores)
    #[arg(short = 't', long, default_value = "0")]
    pub threads: usize,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let start = Instant::now();

    // A bad k fails before the filesystem is touched.
    FilterConfig::validate_k(args.klen)?;

    let inputs = resolve_inputs(&args.inputs, args.recursive)?;
    info!("resolved {} input file(s)", inputs.len());

    let config = FilterConfig {
        k: args.klen,
        inputs,
        min_count: args.min_count,
        complexity_filter: !args.keep_low_complexity,
        threads: args.threads,
    };

    let (filter, stats) = build_filter(&config)?;

    write_filter_file(&filter, &args.output)?;
    info!("wrote {} k-mers to {}", filter.len(), args.output.display());

    // Stats sidecar alongside the artifact.
    let json_path = PathBuf::from(format!("{}.json", args.output.display()));
    let stats_json = json!({
        "k": config.k,
        "min_count": config.min_count,
        "complexity_filter": config.complexity_filter,
        "input_files": config.inputs.len(),
        "sequences": stats.scan.sequences,
        "bases": stats.scan.bases,
        "kmers_counted": stats.scan.kmers,
        "distinct_kmers": stats.distinct_kmers,
        "kmers_written": stats.emit.written,
        "skipped_low_complexity": stats.emit.skipped_low_complexity,
        "skipped_low_count": stats.emit.skipped_low_count,
    });
    let json_file = std::fs::File::create(&json_path)
        .with_context(|| format!("failed to create {}", json_path.display()))?;
    serde_json::to_writer_pretty(json_file, &stats_json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "filter built in {:.1}s: {} entries at k={}",
        elapsed,
        filter.len(),
        config.k,
    );

    Ok(())
}
