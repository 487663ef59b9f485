//! Download daily corrected precipitation for each city from the NASA POWER API and
//! write the precipitation document and CSV table.
use std::{path::PathBuf, process::ExitCode};

use chrono::{Local, NaiveDate};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colored::Colorize;
use error_stack::ResultExt;

use eo_city_rs::{
    config::RunArgs,
    datasets::precipitation::download_precipitation,
    output::precipitation_preview,
};

fn main() -> ExitCode {
    let clargs = Cli::parse();

    env_logger::Builder::new()
        .filter_level(clargs.verbose.log_level_filter())
        .init();

    let res = driver(clargs);
    if let Err(e) = res {
        eprintln!("Error downloading precipitation:\n{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Could not load the configuration")]
    Config,
    #[error("Could not get the precipitation data")]
    Download,
}

#[derive(Debug, Parser)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// The first day to download, in YYYY-MM-DD format
    #[clap(long)]
    start: Option<NaiveDate>,

    /// The last day to download (inclusive), in YYYY-MM-DD format
    #[clap(long)]
    end: Option<NaiveDate>,

    /// Where to write the JSON document, instead of the configured path
    #[clap(long)]
    output_json: Option<PathBuf>,

    /// Where to write the CSV table, instead of the configured path
    #[clap(long)]
    output_csv: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let cfg = clargs.run.load_config()
        .change_context(CliError::Config)?;
    let cities = clargs.run.city_table(&cfg, cfg.precipitation.city_names.as_deref())
        .change_context(CliError::Config)?;

    let mut job = cfg.precipitation_job();
    if let Some(d) = clargs.start {
        job.start = d;
    }
    if let Some(d) = clargs.end {
        job.end = d;
    }
    if let Some(p) = clargs.output_json {
        job.output_json = p;
    }
    if let Some(p) = clargs.output_csv {
        job.output_csv = p;
    }

    let doc = download_precipitation(&job, &cities, Local::now().date_naive())
        .change_context(CliError::Download)?;

    let n_missing = cities.len() - doc.locations.len();
    let status = if n_missing == 0 {
        "OK".on_green().black().bold()
    } else {
        "PARTIAL".on_yellow().black().bold()
    };
    println!(
        "\n{status} precipitation {} to {} for {} of {} cities written to {}",
        job.start, job.end, doc.locations.len(), cities.len(), job.output_json.display()
    );
    for line in precipitation_preview(&doc) {
        println!("{line}");
    }
    Ok(())
}
