use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::filter::artifact::KmerFilter;

#[derive(Args, Debug)]
#[command(about = "Print filter artifact statistics as pretty-printed JSON")]
pub struct StatsArgs {
    /// Path to the filter artifact
    #[arg(short = 'f', long)]
    pub filter: PathBuf,
}

pub fn run(args: StatsArgs) -> Result<()> {
    let size_on_disk = std::fs::metadata(&args.filter)
        .with_context(|| format!("cannot stat {}", args.filter.display()))?
        .len();

    let filter = KmerFilter::load_path(&args.filter)?;

    let output = json!({
        "k": filter.k(),
        "num_kmers": filter.len(),
        "size_on_disk_bytes": size_on_disk,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
