//! Convert an AppEEARS point sample CSV of MODIS land surface temperature into the
//! per-city temperature document and CSV table.
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colored::Colorize;
use error_stack::ResultExt;

use eo_city_rs::{
    config::{PathOverrides, RunArgs},
    datasets::tabular::convert_tabular_temperature,
    output::temperature_preview,
};

fn main() -> ExitCode {
    let clargs = Cli::parse();

    env_logger::Builder::new()
        .filter_level(clargs.verbose.log_level_filter())
        .init();

    let res = driver(clargs);
    if let Err(e) = res {
        eprintln!("Error converting the temperature table:\n{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Could not load the configuration")]
    Config,
    #[error("Could not convert the temperature table")]
    Conversion,
}

/// Convert AppEEARS MOD11A2 point samples to the temperature document. Each row is
/// assigned to the nearest city; rows too far from every city are dropped.
#[derive(Debug, Parser)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(flatten)]
    paths: PathOverrides,

    /// Rows farther than this many degrees from every city are dropped
    #[clap(long)]
    max_distance: Option<f64>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let cfg = clargs.run.load_config()
        .change_context(CliError::Config)?;
    let cities = clargs.run.city_table(&cfg, cfg.tabular_temperature.city_names.as_deref())
        .change_context(CliError::Config)?;

    let mut job = cfg.tabular_job().with_overrides(&clargs.paths);
    if let Some(d) = clargs.max_distance {
        job.max_match_distance_deg = d;
    }

    let doc = convert_tabular_temperature(&job, &cities, Local::now().date_naive())
        .change_context(CliError::Conversion)?;

    println!(
        "\n{} temperature for {} of {} cities written to {}",
        "OK".on_green().black().bold(), doc.locations.len(), cities.len(), job.output_json.display()
    );
    for line in temperature_preview(&doc) {
        println!("{line}");
    }
    Ok(())
}
