//! The conversion pipelines, one module per output document.
//!
//! Every pipeline discovers its inputs, extracts one value per city per input, aggregates the
//! values per city and writes a JSON document and a CSV table. Nothing is written if no city
//! got a valid value.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use error_stack::ResultExt;
use serde::Serialize;

use crate::{
    aggregate::{CityAccumulator, Sample},
    doy::DateParseError,
    output::{write_csv, write_json},
    raster::{sample_point, GeoTiffRaster, NoDataReason, SampleOptions, SampleOutcome},
    utils::{file_name_lossy, find_files},
};

pub mod csv_export;
pub mod ndvi;
pub mod precipitation;
pub mod soil_moisture;
pub mod soil_moisture_daily;
pub mod tabular;
pub mod temperature;

pub type DatasetResult<T> = error_stack::Result<T, DatasetError>;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Could not search for input files")]
    Discovery,
    #[error("No input files matching '{pattern}' found in {}", .dir.display())]
    NoInputFiles { dir: PathBuf, pattern: String },
    #[error("No valid values were extracted for any city")]
    NoValidSamples,
    #[error("Could not read input file {}", .0.display())]
    ReadInput(PathBuf),
    #[error("Input file {} is not in the expected format: {1}", .0.display())]
    BadInput(PathBuf, String),
    #[error("Could not write output file {}", .0.display())]
    WriteOutput(PathBuf),
    #[error("Could not set up the precipitation download")]
    Download,
}

/// Counts from scanning a set of rasters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub n_files: usize,
    pub n_skipped_files: usize,
    pub n_samples: usize,
    pub n_zero_fill: usize,
}

/// Find the input files in `dir`, failing if there are none.
pub(crate) fn discover_inputs(dir: &Path, pattern: &str) -> DatasetResult<Vec<PathBuf>> {
    let (files, n_glob_err) = find_files(dir, pattern)
        .change_context(DatasetError::Discovery)?;

    if n_glob_err > 0 {
        log::warn!("{n_glob_err} entries in {} could not be read while searching for '{pattern}'", dir.display());
    }

    if files.is_empty() {
        return Err(DatasetError::NoInputFiles { dir: dir.to_path_buf(), pattern: pattern.to_string() }.into());
    }

    log::info!("Found {} files matching '{pattern}' in {}", files.len(), dir.display());
    Ok(files)
}

/// Sample every city of `acc` in each of `files`, in order.
///
/// `date_of` gets the date of a file from its path; files it fails on are skipped with a
/// warning, as are files that cannot be opened. `convert` turns a raw pixel value into the
/// output unit, returning `None` for values outside the valid range.
pub(crate) fn scan_rasters<D, F>(files: &[PathBuf], acc: &mut CityAccumulator, options: SampleOptions, date_of: D, convert: F) -> ScanStats
where D: Fn(&Path) -> Result<NaiveDate, DateParseError>,
      F: Fn(f64) -> Option<f64>
{
    let mut stats = ScanStats { n_files: files.len(), ..Default::default() };
    let cities = acc.cities();

    for path in files {
        let name = file_name_lossy(path);
        let date = match date_of(path) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Skipping {name} because {e}");
                stats.n_skipped_files += 1;
                continue;
            }
        };

        let raster = match GeoTiffRaster::open(path) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping {name} because it could not be read: {e}");
                stats.n_skipped_files += 1;
                continue;
            }
        };

        log::info!("Processing {name} ({date})");
        for (i, city) in cities.iter().enumerate() {
            match sample_point(&raster, city.longitude, city.latitude, options) {
                SampleOutcome::Sampled(raw) => {
                    if let Some(value) = convert(raw) {
                        log::debug!("{}: {raw} -> {value}", city.name);
                        acc.push(i, Sample::new(date, raw, value));
                        stats.n_samples += 1;
                    } else {
                        log::debug!("{}: raw value {raw} is outside the valid range", city.name);
                    }
                },
                SampleOutcome::NoData(NoDataReason::Zero) => {
                    log::debug!("{}: zero pixel value treated as fill", city.name);
                    stats.n_zero_fill += 1;
                },
                SampleOutcome::NoData(reason) => log::debug!("{}: no data ({reason})", city.name),
                SampleOutcome::OutOfBounds => log::debug!("{}: outside the raster", city.name),
                SampleOutcome::ReprojectionFailed(reason) | SampleOutcome::ReadFailed(reason) => {
                    log::warn!("Could not sample {} in {name}: {reason}", city.name);
                },
            }
        }
    }

    if stats.n_zero_fill > 0 {
        log::info!("{} zero-valued pixels treated as fill", stats.n_zero_fill);
    }
    if stats.n_skipped_files > 0 {
        log::warn!("{} of {} files were skipped", stats.n_skipped_files, stats.n_files);
    }
    stats
}

/// Write the JSON document and its CSV table, returning the number of CSV data rows.
pub(crate) fn write_outputs<T: Serialize, R: Serialize>(doc: &T, json_path: &Path, rows: &[R], csv_path: &Path) -> DatasetResult<usize> {
    write_json(json_path, doc)
        .change_context_lazy(|| DatasetError::WriteOutput(json_path.to_path_buf()))?;
    log::info!("Wrote {}", json_path.display());

    let n_rows = write_csv(csv_path, rows)
        .change_context_lazy(|| DatasetError::WriteOutput(csv_path.to_path_buf()))?;
    log::info!("Wrote {} ({n_rows} rows)", csv_path.display());
    Ok(n_rows)
}
