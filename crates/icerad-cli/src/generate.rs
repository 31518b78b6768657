//! `icerad generate` — write a neutrino event list.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use icerad_core::Flavor;
use icerad_io::{EventFileWriter, FileHeader};
use icerad_sim::{CylinderVolume, EnergySpectrum, EventGenerator, EventGeneratorConfig};

use crate::{print_summary, SummaryRow};

/// Default file name when the output argument is a folder.
const DEFAULT_FILE_NAME: &str = "event_list.irf";

/// Flavor selection for the CLI.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FlavorArg {
    /// Electron neutrinos only
    Electron,
    /// Muon neutrinos only
    Muon,
    /// Tau neutrinos only
    Tau,
    /// Uniform mix of all three flavors
    All,
}

impl FlavorArg {
    fn flavors(self) -> Vec<Flavor> {
        match self {
            FlavorArg::Electron => vec![Flavor::Electron],
            FlavorArg::Muon => vec![Flavor::Muon],
            FlavorArg::Tau => vec![Flavor::Tau],
            FlavorArg::All => vec![Flavor::Electron, Flavor::Muon, Flavor::Tau],
        }
    }
}

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output file, or a folder that receives `event_list.irf`
    pub output: PathBuf,

    /// Number of events to generate
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub num_events: u64,

    /// Fixed neutrino energy in eV (overrides the power-law options)
    #[arg(long)]
    pub energy: Option<f64>,

    /// Lower power-law bound in eV
    #[arg(long, default_value_t = 1e17)]
    pub energy_min: f64,

    /// Upper power-law bound in eV
    #[arg(long, default_value_t = 1e19)]
    pub energy_max: f64,

    /// Power-law spectral index
    #[arg(long, default_value_t = 2.0)]
    pub spectral_index: f64,

    /// Outer radius of the cylindrical fiducial volume in m
    #[arg(long, default_value_t = 3000.0)]
    pub radius: f64,

    /// Lower z bound of the fiducial volume in m (negative is deep)
    #[arg(long, default_value_t = -2700.0, allow_hyphen_values = true)]
    pub z_min: f64,

    /// Upper z bound of the fiducial volume in m
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub z_max: f64,

    /// Neutrino flavors to generate
    #[arg(long, value_enum, default_value = "all")]
    pub flavor: FlavorArg,

    /// Charged-current fraction
    #[arg(long, default_value_t = 0.7)]
    pub cc_fraction: f64,

    /// RNG seed
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl GenerateArgs {
    fn config(&self) -> EventGeneratorConfig {
        let spectrum = match self.energy {
            Some(energy) => EnergySpectrum::Fixed { energy },
            None => EnergySpectrum::PowerLaw {
                min: self.energy_min,
                max: self.energy_max,
                index: self.spectral_index,
            },
        };
        EventGeneratorConfig {
            n_events: self.num_events,
            spectrum,
            volume: CylinderVolume {
                r_min: 0.0,
                r_max: self.radius,
                z_min: self.z_min,
                z_max: self.z_max,
            },
            flavors: self.flavor.flavors(),
            cc_fraction: self.cc_fraction,
            seed: self.seed,
        }
    }

    /// Resolves the output argument to a concrete file path, creating a
    /// folder when one was asked for.
    pub fn output_path(&self) -> Result<PathBuf> {
        let treat_as_dir = self.output.is_dir() || self.output.extension().is_none();
        if treat_as_dir {
            std::fs::create_dir_all(&self.output)
                .with_context(|| format!("creating folder '{}'", self.output.display()))?;
            Ok(self.output.join(DEFAULT_FILE_NAME))
        } else {
            if let Some(parent) = self.output.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating folder '{}'", parent.display()))?;
                }
            }
            Ok(self.output.clone())
        }
    }
}

/// Runs the generate command.
pub fn execute(args: GenerateArgs) -> Result<()> {
    let config = args.config();
    let path = args.output_path()?;

    let mut generator = EventGenerator::new(config.clone()).context("invalid generator settings")?;
    let events = generator.generate();

    let header = FileHeader::event_list(serde_json::json!({
        "generator": config,
        "tool_version": env!("CARGO_PKG_VERSION"),
    }));
    let mut writer = EventFileWriter::create(&path, header)
        .with_context(|| format!("creating '{}'", path.display()))?;

    let progress = ProgressBar::new(events.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} events")
            .expect("valid progress template"),
    );
    for event in &events {
        writer.append_neutrino(event)?;
        progress.inc(1);
    }
    progress.finish_and_clear();
    let written = writer.finish()?;

    let (e_min, e_max) = config.spectrum.bounds();
    println!("{}", "Event list written".green().bold());
    print_summary(vec![
        SummaryRow::new("Events", written.to_string()),
        SummaryRow::new("Energy range", format!("{e_min:.2e} - {e_max:.2e} eV")),
        SummaryRow::new(
            "Fiducial volume",
            format!("{:.3e} m^3", config.volume.volume()),
        ),
        SummaryRow::new("Seed", config.seed.to_string()),
        SummaryRow::new("Output", path.display().to_string()),
    ]);
    Ok(())
}
