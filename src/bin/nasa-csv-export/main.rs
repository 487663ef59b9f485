//! Regenerate the temperature, NDVI and summary CSV tables from existing JSON documents.
use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colored::Colorize;
use error_stack::ResultExt;

use eo_city_rs::{config::ConvertConfig, datasets::csv_export::export_csv};

fn main() -> ExitCode {
    let clargs = Cli::parse();

    env_logger::Builder::new()
        .filter_level(clargs.verbose.log_level_filter())
        .init();

    let res = driver(clargs);
    if let Err(e) = res {
        eprintln!("Error exporting CSV tables:\n{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Could not load the configuration")]
    Config,
    #[error("Could not export the CSV tables")]
    Export,
}

#[derive(Debug, Parser)]
struct Cli {
    /// A TOML configuration file. Without one, the documents are read from and the
    /// tables written to public/data/ under the current directory.
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// The temperature document to read, instead of the configured path
    #[clap(long)]
    temperature_json: Option<PathBuf>,

    /// The NDVI document to read, instead of the configured path
    #[clap(long)]
    ndvi_json: Option<PathBuf>,

    /// Directory to write all three tables to, keeping their configured file names
    #[clap(short = 'o', long)]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let cfg = ConvertConfig::load_or_default(clargs.config.as_deref())
        .change_context(CliError::Config)?;

    let mut job = cfg.csv_export_job();
    if let Some(p) = clargs.temperature_json {
        job.temperature_json = p;
    }
    if let Some(p) = clargs.ndvi_json {
        job.ndvi_json = p;
    }
    if let Some(dir) = clargs.output_dir {
        for table in [&mut job.temperature_csv, &mut job.ndvi_csv, &mut job.summary_csv] {
            if let Some(name) = table.file_name() {
                *table = dir.join(name);
            }
        }
    }

    let counts = export_csv(&job)
        .change_context(CliError::Export)?;

    println!("\nSummary:");
    for (n_rows, table) in [(counts.temperature, &job.temperature_csv), (counts.ndvi, &job.ndvi_csv), (counts.summary, &job.summary_csv)] {
        match n_rows {
            Some(n) => println!("{:^8} {} ({n} rows)", "OK".on_green().black().bold(), table.display()),
            None => println!("{:^8} {}", "SKIPPED".on_red().black().bold(), table.display()),
        }
    }
    Ok(())
}
