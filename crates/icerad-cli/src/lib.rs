//! icerad command-line interface.
//!
//! One binary, four operations covering the simulation workflow:
//!
//! ```bash
//! # write an event list into a folder
//! icerad generate runs/ --num-events 5000 --seed 7
//!
//! # run the detector simulation
//! icerad simulate runs/event_list.irf detector.json runs/output.irf
//!
//! # plots land in a "plot" folder next to the input
//! icerad visualize runs/output.irf
//!
//! # combine partial outputs
//! icerad merge runs/part*.irf -o runs/combined.irf --threads 4
//! ```

use clap::{Parser, Subcommand};
use tabled::{settings::Style, Table, Tabled};

pub mod generate;
pub mod merge;
pub mod plot;
pub mod simulate;
pub mod visualize;

/// One row of the two-column summary every command prints on success.
#[derive(Tabled)]
pub struct SummaryRow {
    /// Quantity name
    #[tabled(rename = "Quantity")]
    pub quantity: String,
    /// Formatted value
    #[tabled(rename = "Value")]
    pub value: String,
}

impl SummaryRow {
    /// Creates a row.
    pub fn new(quantity: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            quantity: quantity.into(),
            value: value.into(),
        }
    }
}

/// Prints the summary table.
pub fn print_summary(rows: Vec<SummaryRow>) {
    println!("{}", Table::new(rows).with(Style::rounded()));
}

/// icerad command-line interface
#[derive(Parser, Debug)]
#[command(name = "icerad")]
#[command(author, version, about = "In-ice radio neutrino detection simulation suite")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a neutrino event list
    Generate(generate::GenerateArgs),

    /// Run the detector simulation over an event list
    Simulate(simulate::SimulateArgs),

    /// Produce plots from a simulation output file
    Visualize(visualize::VisualizeArgs),

    /// Merge simulation output files
    Merge(merge::MergeArgs),

    /// Display version information
    Version,
}
