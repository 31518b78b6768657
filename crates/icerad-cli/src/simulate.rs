//! `icerad simulate` — run the detector simulation over an event list.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use icerad_detector::{AntennaRegistry, DetectorDescription};
use icerad_io::{EventFileReader, EventFileWriter, FileHeader, FileKind};
use icerad_sim::{EventGeneratorConfig, SimulationConfig, SimulationPipeline, VeffEstimate};
use tracing::info;

use crate::{print_summary, SummaryRow};

/// Arguments for the simulate command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Input event-list file
    pub input: PathBuf,

    /// Detector description (JSON)
    pub detector: PathBuf,

    /// Output file
    pub output: PathBuf,

    /// Skip the thermal noise stage
    #[arg(long)]
    pub no_noise: bool,

    /// Digitize the readout traces with the ADC parameters from the
    /// detector file
    #[arg(long)]
    pub digitize: bool,

    /// Write only events with at least one fired station trigger
    #[arg(long)]
    pub drop_untriggered: bool,

    /// Channels required for a station trigger
    #[arg(long, default_value_t = 1)]
    pub coincidence: usize,

    /// Coincidence window in ns
    #[arg(long, default_value_t = 100.0)]
    pub coincidence_window: f64,

    /// RNG seed for noise and the ADC clock offset
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl SimulateArgs {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            add_noise: !self.no_noise,
            digitize: self.digitize,
            keep_untriggered: !self.drop_untriggered,
            coincidence: self.coincidence,
            coincidence_window: self.coincidence_window,
            seed: self.seed,
            ..SimulationConfig::default()
        }
    }
}

/// Runs the simulate command.
pub fn execute(args: SimulateArgs) -> Result<()> {
    let mut reader = EventFileReader::open(&args.input)
        .with_context(|| format!("opening '{}'", args.input.display()))?;
    if reader.header().kind != FileKind::EventList {
        bail!(
            "'{}' is not an event list (kind {:?})",
            args.input.display(),
            reader.header().kind
        );
    }
    let generator_metadata = reader.header().metadata.get("generator").cloned();
    let events = reader
        .read_event_list()
        .with_context(|| format!("reading '{}'", args.input.display()))?;
    if events.is_empty() {
        bail!("'{}' contains no events", args.input.display());
    }

    let detector = DetectorDescription::from_json_file(&args.detector)
        .with_context(|| format!("loading detector '{}'", args.detector.display()))?;
    let fingerprint = detector.fingerprint();
    info!(
        n_events = events.len(),
        n_stations = detector.stations.len(),
        "starting simulation"
    );

    let config = args.config();
    let mut pipeline =
        SimulationPipeline::new(detector, AntennaRegistry::with_builtin(), config.clone())
            .context("building the simulation pipeline")?;

    let header = FileHeader::sim_output(
        pipeline.run_id(),
        fingerprint,
        serde_json::json!({
            "generator": generator_metadata,
            "simulation": config,
            "source": args.input.display().to_string(),
            "tool_version": env!("CARGO_PKG_VERSION"),
        }),
    );
    let mut writer = EventFileWriter::create(&args.output, header)
        .with_context(|| format!("creating '{}'", args.output.display()))?;

    let progress = ProgressBar::new(events.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} events {msg}")
            .expect("valid progress template"),
    );
    for event in &events {
        if let Some(simulated) = pipeline.simulate_one(event)? {
            writer.append_event(&simulated)?;
        }
        progress.inc(1);
        progress.set_message(format!("{} triggered", pipeline.stats().n_triggered));
    }
    progress.finish_and_clear();
    pipeline.end();
    let written = writer.finish()?;

    let stats = *pipeline.stats();
    println!("{}", "Simulation complete".green().bold());
    let mut rows = vec![
        SummaryRow::new("Input events", stats.n_input.to_string()),
        SummaryRow::new("Simulated", stats.n_simulated.to_string()),
        SummaryRow::new("Triggered", stats.n_triggered.to_string()),
        SummaryRow::new("Skipped", stats.n_skipped.to_string()),
        SummaryRow::new("Written", written.to_string()),
    ];

    // effective volume, when the input file recorded its generation volume
    if let Some(value) = generator_metadata {
        if let Ok(generator) = serde_json::from_value::<EventGeneratorConfig>(value) {
            let veff = VeffEstimate::from_counts(
                &generator.volume,
                stats.n_triggered,
                stats.n_simulated,
            );
            rows.push(SummaryRow::new(
                "Effective volume",
                format!("{:.3e} +- {:.1e} m^3", veff.veff, veff.veff_uncertainty),
            ));
        }
    }
    rows.push(SummaryRow::new("Output", args.output.display().to_string()));
    print_summary(rows);
    Ok(())
}
