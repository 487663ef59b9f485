//! Convert GeoTIFF rasters downloaded from NASA (MODIS land surface temperature,
//! MODIS NDVI and SMAP soil moisture) into per-city JSON documents and CSV tables.
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colored::Colorize;
use error_stack::ResultExt;

use eo_city_rs::{
    config::{PathOverrides, RasterDataset, RunArgs},
    datasets::{ndvi, soil_moisture, soil_moisture_daily, temperature},
    output::{coverage_summary, ndvi_preview, soil_moisture_daily_preview, soil_moisture_preview, temperature_preview},
};

fn main() -> ExitCode {
    let clargs = Cli::parse();

    env_logger::Builder::new()
        .filter_level(clargs.verbose.log_level_filter())
        .init();

    let res = driver(clargs);
    if let Err(e) = res {
        eprintln!("Error converting rasters:\n{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Could not load the configuration")]
    Config,
    #[error("Could not convert the {0} rasters")]
    Conversion(&'static str),
}

// ---------------------- //
// Command line interface //
// ---------------------- //

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    dataset: DatasetCli,

    #[command(flatten)]
    run: RunArgs,

    #[command(flatten)]
    paths: PathOverrides,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum DatasetCli {
    /// MODIS MOD11A2 8-day daytime land surface temperature
    Temperature,
    /// MODIS 16-day NDVI
    Ndvi,
    /// SMAP L4 surface and root zone soil moisture, one section per layer
    SoilMoisture,
    /// SMAP L4 root zone soil moisture averaged to daily values
    SoilMoistureDaily,
}

impl DatasetCli {
    fn name(&self) -> &'static str {
        match self {
            DatasetCli::Temperature => "temperature",
            DatasetCli::Ndvi => "NDVI",
            DatasetCli::SoilMoisture => "soil moisture",
            DatasetCli::SoilMoistureDaily => "daily soil moisture",
        }
    }
}

impl From<DatasetCli> for RasterDataset {
    fn from(value: DatasetCli) -> Self {
        match value {
            DatasetCli::Temperature => RasterDataset::Temperature,
            DatasetCli::Ndvi => RasterDataset::Ndvi,
            DatasetCli::SoilMoisture => RasterDataset::SoilMoisture,
            DatasetCli::SoilMoistureDaily => RasterDataset::SoilMoistureDaily,
        }
    }
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let cfg = clargs.run.load_config()
        .change_context(CliError::Config)?;
    let dataset = RasterDataset::from(clargs.dataset);
    let cities = clargs.run.city_table(&cfg, cfg.raster_section(dataset).city_names.as_deref())
        .change_context(CliError::Config)?;
    let generated = Local::now().date_naive();
    let name = clargs.dataset.name();

    log::info!("Converting {name} rasters for {} cities", cities.len());
    let (lines, counts, output_json) = match clargs.dataset {
        DatasetCli::Temperature => {
            let job = cfg.raster_job(dataset).with_overrides(&clargs.paths);
            let doc = temperature::convert_temperature(&job, &cities, generated)
                .change_context(CliError::Conversion(name))?;
            (temperature_preview(&doc), vec![(String::new(), doc.locations.len())], job.output_json)
        },
        DatasetCli::Ndvi => {
            let job = cfg.raster_job(dataset).with_overrides(&clargs.paths);
            let doc = ndvi::convert_ndvi(&job, &cities, generated)
                .change_context(CliError::Conversion(name))?;
            (ndvi_preview(&doc), vec![(String::new(), doc.locations.len())], job.output_json)
        },
        DatasetCli::SoilMoisture => {
            let mut job = cfg.soil_moisture_job();
            job.raster = job.raster.with_overrides(&clargs.paths);
            let doc = soil_moisture::convert_soil_moisture(&job, &cities, generated)
                .change_context(CliError::Conversion(name))?;
            let counts: Vec<(String, usize)> = doc.layers.iter().map(|(layer, l)| (layer.clone(), l.locations.len())).collect();
            (soil_moisture_preview(&doc), counts, job.raster.output_json)
        },
        DatasetCli::SoilMoistureDaily => {
            let job = cfg.raster_job(dataset).with_overrides(&clargs.paths);
            let doc = soil_moisture_daily::convert_soil_moisture_daily(&job, &cities, generated)
                .change_context(CliError::Conversion(name))?;
            let counts: Vec<(String, usize)> = doc.layers.iter().map(|(layer, l)| (layer.clone(), l.locations.len())).collect();
            (soil_moisture_daily_preview(&doc), counts, job.output_json)
        },
    };

    let layer_counts: Vec<(&str, usize)> = counts.iter().map(|(layer, n)| (layer.as_str(), *n)).collect();
    println!(
        "\n{} {name} for {} written to {}",
        "OK".on_green().black().bold(), coverage_summary(&layer_counts, cities.len()), output_json.display()
    );
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
