//! icerad CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use icerad_cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => icerad_cli::generate::execute(args)?,
        Commands::Simulate(args) => icerad_cli::simulate::execute(args)?,
        Commands::Visualize(args) => icerad_cli::visualize::execute(args)?,
        Commands::Merge(args) => icerad_cli::merge::execute(args)?,
        Commands::Version => {
            println!("icerad {}", env!("CARGO_PKG_VERSION"));
            println!("core module version: {}", icerad_core::VERSION);
            println!("signal module version: {}", icerad_signal::VERSION);
            println!("io module version: {}", icerad_io::VERSION);
        }
    }

    Ok(())
}
