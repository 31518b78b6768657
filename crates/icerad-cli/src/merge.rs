//! `icerad merge` — combine simulation output files.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use icerad_io::{merge_files, MergeConfig};

use crate::{print_summary, SummaryRow};

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input files, merged in the given order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Concurrent reader threads
    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Memory budget for buffered records, in MiB
    #[arg(long, default_value_t = 4096)]
    pub memory_limit_mb: u64,
}

/// Runs the merge command.
pub fn execute(args: MergeArgs) -> Result<()> {
    let config = MergeConfig {
        threads: args.threads,
        memory_limit_bytes: args.memory_limit_mb * 1024 * 1024,
    };
    let report = merge_files(&args.inputs, &args.output, &config)
        .with_context(|| format!("merging into '{}'", args.output.display()))?;

    println!("{}", "Merge complete".green().bold());
    print_summary(vec![
        SummaryRow::new("Input files", report.n_inputs.to_string()),
        SummaryRow::new("Records", report.n_records.to_string()),
        SummaryRow::new("Threads", args.threads.to_string()),
        SummaryRow::new("Output", report.output.display().to_string()),
    ]);
    Ok(())
}
