//! `icerad visualize` — plots from a simulation output file.
//!
//! Plots are written as SVG into a `plot` folder next to the input file:
//! the neutrino energy spectrum, the zenith distribution, the trigger
//! fraction against energy, and the strongest waveform of the first few
//! triggered events.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use icerad_core::{utils, SimEvent};
use icerad_io::{EventFileReader, FileKind};
use icerad_sim::TriggerFractionBinned;

use crate::plot::{self, Series};
use crate::{print_summary, SummaryRow};

/// Arguments for the visualize command
#[derive(Args, Debug)]
pub struct VisualizeArgs {
    /// Simulation output file
    pub input: PathBuf,

    /// Number of triggered-event waveforms to plot
    #[arg(long, default_value_t = 5)]
    pub max_waveforms: usize,

    /// Energy bins of the spectrum and trigger-fraction plots
    #[arg(long, default_value_t = 20)]
    pub energy_bins: usize,
}

/// Runs the visualize command.
pub fn execute(args: VisualizeArgs) -> Result<()> {
    let mut reader = EventFileReader::open(&args.input)
        .with_context(|| format!("opening '{}'", args.input.display()))?;
    if reader.header().kind != FileKind::SimOutput {
        bail!(
            "'{}' is not a simulation output file (kind {:?})",
            args.input.display(),
            reader.header().kind
        );
    }
    let events = reader
        .read_sim_output()
        .with_context(|| format!("reading '{}'", args.input.display()))?;
    if events.is_empty() {
        bail!("'{}' contains no events to plot", args.input.display());
    }

    let plot_dir = args
        .input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("plot");
    std::fs::create_dir_all(&plot_dir)
        .with_context(|| format!("creating '{}'", plot_dir.display()))?;

    let mut written = Vec::new();
    written.push(energy_spectrum(&events, args.energy_bins, &plot_dir)?);
    written.push(zenith_distribution(&events, &plot_dir)?);
    written.push(trigger_fraction(&events, args.energy_bins, &plot_dir)?);
    let n_waveforms = waveforms(&events, args.max_waveforms, &plot_dir)?;

    let n_triggered = events.iter().filter(|e| e.has_triggered()).count();
    println!("{}", "Plots written".green().bold());
    print_summary(vec![
        SummaryRow::new("Events", events.len().to_string()),
        SummaryRow::new("Triggered", n_triggered.to_string()),
        SummaryRow::new("Distribution plots", written.len().to_string()),
        SummaryRow::new("Waveform plots", n_waveforms.to_string()),
        SummaryRow::new("Plot folder", plot_dir.display().to_string()),
    ]);
    Ok(())
}

/// Energy bin edges spanning the simulated population.
fn energy_edges(events: &[SimEvent], n_bins: usize) -> Vec<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for event in events {
        min = min.min(event.neutrino.energy);
        max = max.max(event.neutrino.energy);
    }
    if !(max > min) {
        // a fixed-energy run: open the range by a factor 2 either side
        min *= 0.5;
        max *= 2.0;
    }
    utils::log_bin_edges(min, max, n_bins)
}

fn energy_spectrum(events: &[SimEvent], n_bins: usize, plot_dir: &Path) -> Result<PathBuf> {
    let energies: Vec<f64> = events.iter().map(|e| e.neutrino.energy).collect();
    let edges = energy_edges(events, n_bins);
    let counts = utils::histogram_edges(&energies, &edges);
    let svg = plot::histogram(
        "Neutrino energy spectrum",
        "energy [eV]",
        "events",
        true,
        &edges,
        &counts,
    );
    let path = plot_dir.join("energy_spectrum.svg");
    std::fs::write(&path, svg).with_context(|| format!("writing '{}'", path.display()))?;
    Ok(path)
}

fn zenith_distribution(events: &[SimEvent], plot_dir: &Path) -> Result<PathBuf> {
    let zeniths: Vec<f64> = events
        .iter()
        .map(|e| e.neutrino.direction.zenith.to_degrees())
        .collect();
    let (edges, counts) = utils::histogram(&zeniths, 0.0, 180.0, 18);
    let svg = plot::histogram(
        "Arrival directions",
        "zenith [deg]",
        "events",
        false,
        &edges,
        &counts,
    );
    let path = plot_dir.join("zenith_distribution.svg");
    std::fs::write(&path, svg).with_context(|| format!("writing '{}'", path.display()))?;
    Ok(path)
}

fn trigger_fraction(events: &[SimEvent], n_bins: usize, plot_dir: &Path) -> Result<PathBuf> {
    let edges = energy_edges(events, n_bins);
    let binned = TriggerFractionBinned::from_events(events, &edges);
    let fractions = binned.fractions();
    let points: Vec<(f64, f64)> = binned
        .edges
        .windows(2)
        .zip(fractions.iter())
        .map(|(edge_pair, &fraction)| ((edge_pair[0] * edge_pair[1]).sqrt(), fraction))
        .collect();
    let svg = plot::line_chart(
        "Trigger fraction vs energy",
        "energy [eV]",
        "triggered fraction",
        true,
        &[Series {
            label: "all stations".into(),
            points,
        }],
    );
    let path = plot_dir.join("trigger_fraction.svg");
    std::fs::write(&path, svg).with_context(|| format!("writing '{}'", path.display()))?;
    Ok(path)
}

/// Plots the strongest channel of the first `max` triggered events.
/// Returns the number of waveform files written.
fn waveforms(events: &[SimEvent], max: usize, plot_dir: &Path) -> Result<usize> {
    let mut written = 0;
    for event in events.iter().filter(|e| e.has_triggered()).take(max) {
        let mut best: Option<(usize, usize, f64)> = None;
        for (s_idx, station) in event.stations.iter().enumerate() {
            for (c_idx, channel) in station.channels.iter().enumerate() {
                let peak = channel.trace.peak_amplitude();
                if best.map_or(true, |(_, _, b)| peak > b) {
                    best = Some((s_idx, c_idx, peak));
                }
            }
        }
        let Some((s_idx, c_idx, _)) = best else {
            continue;
        };
        let station = &event.stations[s_idx];
        let channel = &station.channels[c_idx];

        let points: Vec<(f64, f64)> = channel
            .trace
            .times()
            .iter()
            .zip(channel.trace.samples().iter())
            .map(|(&t, &v)| (t, v))
            .collect();
        let title = format!(
            "Event {} station {} channel {}",
            event.neutrino.id, station.id, channel.id
        );
        let svg = plot::line_chart(&title, "time [ns]", "voltage [V]", false, &[Series {
            label: "trace".into(),
            points,
        }]);
        let path = plot_dir.join(format!(
            "waveform_ev{}_st{}_ch{}.svg",
            event.neutrino.id, station.id, channel.id
        ));
        std::fs::write(&path, svg).with_context(|| format!("writing '{}'", path.display()))?;
        written += 1;
    }
    Ok(written)
}
