//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::data::{filter_cohort, load_directory, GroupSpec};
use crate::error::Result;
use crate::eval::DEFAULT_FOLDS;
use crate::experiment::{run_experiment, ExperimentConfig, ExperimentReport};
use crate::store::{FsStore, MemoryStore};

#[derive(Parser)]
#[command(name = "fairtune")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fairness-aware transfer-learning evaluation for surveillance mortality prediction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full experiment over a directory of surveillance CSV files
    Run {
        /// Directory containing the surveillance CSV files
        data_dir: PathBuf,

        /// Persist model artifacts under this directory instead of in memory
        #[arg(long)]
        store_dir: Option<PathBuf>,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = DEFAULT_FOLDS)]
        folds: usize,

        /// Write the full report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report per-group cohort sizes without training anything
    Inspect {
        /// Directory containing the surveillance CSV files
        data_dir: PathBuf,
    },
}

pub fn cmd_run(
    data_dir: &Path,
    store_dir: Option<&Path>,
    folds: usize,
    output: Option<&Path>,
) -> Result<()> {
    let records = load_directory(data_dir)?;
    let config = ExperimentConfig {
        folds,
        ..ExperimentConfig::default()
    };

    let report = match store_dir {
        Some(dir) => {
            let store = FsStore::new(dir)?;
            run_experiment(&records, &store, &config)?
        }
        None => {
            let store = MemoryStore::new();
            run_experiment(&records, &store, &config)?
        }
    };

    print_report(&report);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        println!("\nreport written to {}", path.display());
    }

    Ok(())
}

pub fn cmd_inspect(data_dir: &Path) -> Result<()> {
    let records = load_directory(data_dir)?;

    println!("records loaded: {}", records.height());
    let mut specs = vec![GroupSpec::reference()];
    specs.extend(GroupSpec::minority_groups());
    for spec in specs {
        match filter_cohort(&records, &spec) {
            Ok(cohort) => println!("  {:<34} {:>8}", spec.name, cohort.len()),
            Err(e) => println!("  {:<34} {}", spec.name, e),
        }
    }

    Ok(())
}

fn print_report(report: &ExperimentReport) {
    println!(
        "\nBase training on {} ({} records)",
        report.reference_group, report.reference_size
    );
    for (classifier, metrics) in &report.reference_metrics {
        print!("  {classifier:<20}");
        for (name, value) in metrics.entries() {
            print!(" {name} {value:.3}");
        }
        println!();
    }

    for group in &report.groups {
        println!("\n{} ({} records)", group.group, group.cohort_size);
        for (classifier, comparison) in &group.equalized_odds {
            println!("  {classifier}");
            if let Some(metrics) = group.fine_tuned_metrics.get(classifier) {
                print!("    fine-tuned scores:");
                for (name, value) in metrics.entries() {
                    print!(" {name} {value:.3}");
                }
                println!();
            }
            for (label, odds) in [
                ("base", &comparison.base_model),
                ("fine-tuned", &comparison.fine_tuned_model),
            ] {
                for (value, rates) in &odds.groups {
                    println!(
                        "    {label:<10} {value:<40} TPR {:.3}  FPR {:.3}  (n={})",
                        rates.true_positive_rate, rates.false_positive_rate, rates.group_size
                    );
                }
            }
        }
    }
}
