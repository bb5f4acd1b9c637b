//! fairtune - Main entry point

use clap::Parser;
use fairtune::cli::{cmd_inspect, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fairtune=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data_dir,
            store_dir,
            folds,
            output,
        } => {
            cmd_run(
                &data_dir,
                store_dir.as_deref(),
                folds,
                output.as_deref(),
            )?;
        }
        Commands::Inspect { data_dir } => {
            cmd_inspect(&data_dir)?;
        }
    }

    Ok(())
}
