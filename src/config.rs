//! Configuration shared by all the converters.
//!
//! Everything has a default matching the usual `raw-nasa-data` -> `public/data` layout, so
//! the programs run without a configuration file. A TOML file only needs the values that
//! differ; relative paths in it are interpreted relative to the file's directory.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{cities::{CityTable, CityTableError}, path_relative_to_config, raster::SampleOptions};

pub const DEFAULT_POWER_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";
pub const DEFAULT_SOIL_LAYERS: [&str; 2] = ["sm_surface", "sm_rootzone"];


#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read configuration file {}: {1}", .0.display())]
    IoError(PathBuf, std::io::Error),
    #[error("The configuration file {} is not correct: {1}", .0.display())]
    ParseError(PathBuf, toml::de::Error),
    #[error("Could not load the city table: {0}")]
    Cities(#[from] CityTableError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The top level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Region name written into every output document
    pub region: Option<String>,

    /// A JSON or TOML file with the city table. The built-in Benin table is used if omitted.
    pub cities_file: Option<PathBuf>,

    /// Names of the cities to process, in output order. All cities if omitted.
    /// Each dataset section can override this.
    pub city_names: Option<Vec<String>>,

    pub temperature: RasterSection,
    pub ndvi: RasterSection,
    pub soil_moisture: SoilMoistureSection,
    pub soil_moisture_daily: RasterSection,
    pub tabular_temperature: TabularSection,
    pub precipitation: PrecipitationSection,
    pub csv_export: CsvExportSection,
}

/// Settings for one raster based dataset. Unset values take the dataset's default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSection {
    pub input_dir: Option<PathBuf>,
    /// Glob pattern for input file names, relative to `input_dir`
    pub file_glob: Option<String>,
    pub output_json: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    /// How many of the most recent samples to export per city
    pub timeseries_window: Option<usize>,
    /// Whether a raw pixel value of exactly 0 counts as no data
    pub treat_zero_as_fill: Option<bool>,
    pub city_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilMoistureSection {
    #[serde(flatten)]
    pub raster: RasterSection,
    /// The layer names to extract; files for other layers are ignored
    pub layers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularSection {
    pub input_dir: Option<PathBuf>,
    pub file_glob: Option<String>,
    /// Where to look if nothing matches in `input_dir`
    pub fallback_dir: Option<PathBuf>,
    pub fallback_glob: Option<String>,
    pub output_json: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub timeseries_window: Option<usize>,
    /// Records farther than this from every city (in degrees) are dropped
    pub max_match_distance_deg: Option<f64>,
    pub city_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecipitationSection {
    pub base_url: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub timeout_secs: Option<u64>,
    pub output_json: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub city_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvExportSection {
    pub temperature_json: Option<PathBuf>,
    pub ndvi_json: Option<PathBuf>,
    pub temperature_csv: Option<PathBuf>,
    pub ndvi_csv: Option<PathBuf>,
    pub summary_csv: Option<PathBuf>,
}

/// Fully resolved settings for one raster dataset run.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterJob {
    pub region: String,
    pub input_dir: PathBuf,
    pub file_glob: String,
    pub output_json: PathBuf,
    pub output_csv: PathBuf,
    pub timeseries_window: usize,
    pub sample_options: SampleOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoilMoistureJob {
    pub raster: RasterJob,
    pub layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabularJob {
    pub region: String,
    pub input_dir: PathBuf,
    pub file_glob: String,
    pub fallback_dir: PathBuf,
    pub fallback_glob: String,
    pub output_json: PathBuf,
    pub output_csv: PathBuf,
    pub timeseries_window: usize,
    pub max_match_distance_deg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrecipitationJob {
    pub region: String,
    pub base_url: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timeout_secs: u64,
    pub output_json: PathBuf,
    pub output_csv: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvExportJob {
    pub temperature_json: PathBuf,
    pub ndvi_json: PathBuf,
    pub temperature_csv: PathBuf,
    pub ndvi_csv: PathBuf,
    pub summary_csv: PathBuf,
}

/// Command line options shared by every converter.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// A TOML configuration file. Without one, the built-in defaults are used,
    /// which read from raw-nasa-data/ and write to public/data/ under the current directory.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Only process these cities (comma separated, in output order). Overrides
    /// any city selection in the configuration file.
    #[clap(long, value_delimiter = ',')]
    pub cities: Option<Vec<String>>,
}

impl RunArgs {
    pub fn load_config(&self) -> Result<ConvertConfig, ConfigError> {
        ConvertConfig::load_or_default(self.config.as_deref())
    }

    /// The city table for a dataset whose section selects `section_names`.
    pub fn city_table(&self, cfg: &ConvertConfig, section_names: Option<&[String]>) -> Result<CityTable, ConfigError> {
        cfg.city_table(self.cities.as_deref().or(section_names))
    }
}

/// Command line overrides of a dataset's file locations.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PathOverrides {
    /// Directory to read input files from, instead of the configured one
    #[clap(short = 'i', long)]
    pub input_dir: Option<PathBuf>,

    /// Where to write the JSON document, instead of the configured path
    #[clap(long)]
    pub output_json: Option<PathBuf>,

    /// Where to write the CSV table, instead of the configured path
    #[clap(long)]
    pub output_csv: Option<PathBuf>,
}

impl PathOverrides {
    fn apply(&self, input_dir: &mut PathBuf, output_json: &mut PathBuf, output_csv: &mut PathBuf) {
        if let Some(p) = &self.input_dir {
            *input_dir = p.clone();
        }
        if let Some(p) = &self.output_json {
            *output_json = p.clone();
        }
        if let Some(p) = &self.output_csv {
            *output_csv = p.clone();
        }
    }
}

impl RasterJob {
    pub fn with_overrides(mut self, paths: &PathOverrides) -> Self {
        paths.apply(&mut self.input_dir, &mut self.output_json, &mut self.output_csv);
        self
    }
}

impl TabularJob {
    /// Apply the overrides. An overridden input directory is searched without a fallback.
    pub fn with_overrides(mut self, paths: &PathOverrides) -> Self {
        if let Some(dir) = &paths.input_dir {
            self.fallback_dir = dir.clone();
        }
        paths.apply(&mut self.input_dir, &mut self.output_json, &mut self.output_csv);
        self
    }
}

/// Which raster dataset to resolve settings for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterDataset {
    Temperature,
    Ndvi,
    SoilMoisture,
    SoilMoistureDaily,
}

struct RasterDefaults {
    input_dir: &'static str,
    file_glob: &'static str,
    output_json: &'static str,
    output_csv: &'static str,
    timeseries_window: usize,
}

impl RasterDataset {
    fn defaults(&self) -> RasterDefaults {
        match self {
            RasterDataset::Temperature => RasterDefaults {
                input_dir: "raw-nasa-data/temperature",
                file_glob: "*LST_Day_1km*.tif",
                output_json: "public/data/nasa-temperature-benin.json",
                output_csv: "public/data/csv/nasa-temperature-benin.csv",
                timeseries_window: 5,
            },
            RasterDataset::Ndvi => RasterDefaults {
                input_dir: "raw-nasa-data/ndvi",
                file_glob: "*NDVI*.tif",
                output_json: "public/data/nasa-ndvi-benin.json",
                output_csv: "public/data/csv/nasa-ndvi-benin.csv",
                timeseries_window: 5,
            },
            RasterDataset::SoilMoisture => RasterDefaults {
                input_dir: "raw-nasa-data/soil-moisture",
                file_glob: "*.tif",
                output_json: "public/data/nasa-smap-benin.json",
                output_csv: "public/data/csv/nasa-smap-benin.csv",
                timeseries_window: 5,
            },
            RasterDataset::SoilMoistureDaily => RasterDefaults {
                input_dir: "raw-nasa-data/soil-moisture",
                file_glob: "*sm_rootzone*.tif",
                output_json: "public/data/nasa-soil-moisture-benin.json",
                output_csv: "public/data/nasa-soil-moisture-benin.csv",
                timeseries_window: 30,
            },
        }
    }
}

impl ConvertConfig {
    /// Read a configuration file, making relative paths in it relative to the file.
    pub fn read_from_path<P: AsRef<Path>>(p: P) -> Result<Self, ConfigError> {
        let p = p.as_ref();
        let contents = std::fs::read_to_string(p)
            .map_err(|e| ConfigError::IoError(p.to_path_buf(), e))?;
        let mut cfg: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(p.to_path_buf(), e))?;
        cfg.make_paths_relative_to(p);
        Ok(cfg)
    }

    /// Read `config_file` if given, otherwise use the defaults.
    pub fn load_or_default(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(p) = config_file {
            log::info!("Reading configuration from {}", p.display());
            Self::read_from_path(p)
        } else {
            Ok(Self::default())
        }
    }

    /// A configuration with every value spelled out, for writing as a template.
    pub fn filled_defaults() -> Self {
        let raster = |ds: RasterDataset| {
            let d = ds.defaults();
            RasterSection {
                input_dir: Some(d.input_dir.into()),
                file_glob: Some(d.file_glob.to_string()),
                output_json: Some(d.output_json.into()),
                output_csv: Some(d.output_csv.into()),
                timeseries_window: Some(d.timeseries_window),
                treat_zero_as_fill: Some(true),
                city_names: None,
            }
        };

        let tab = Self::default().tabular_job();
        let precip = Self::default().precipitation_job();
        let export = Self::default().csv_export_job();

        Self {
            region: Some(default_region()),
            cities_file: None,
            city_names: None,
            temperature: raster(RasterDataset::Temperature),
            ndvi: raster(RasterDataset::Ndvi),
            soil_moisture: SoilMoistureSection {
                raster: raster(RasterDataset::SoilMoisture),
                layers: Some(DEFAULT_SOIL_LAYERS.iter().map(|s| s.to_string()).collect()),
            },
            soil_moisture_daily: raster(RasterDataset::SoilMoistureDaily),
            tabular_temperature: TabularSection {
                input_dir: Some(tab.input_dir),
                file_glob: Some(tab.file_glob),
                fallback_dir: Some(tab.fallback_dir),
                fallback_glob: Some(tab.fallback_glob),
                output_json: Some(tab.output_json),
                output_csv: Some(tab.output_csv),
                timeseries_window: Some(tab.timeseries_window),
                max_match_distance_deg: Some(tab.max_match_distance_deg),
                city_names: None,
            },
            precipitation: PrecipitationSection {
                base_url: Some(precip.base_url),
                start: Some(precip.start),
                end: Some(precip.end),
                timeout_secs: Some(precip.timeout_secs),
                output_json: Some(precip.output_json),
                output_csv: Some(precip.output_csv),
                city_names: None,
            },
            csv_export: CsvExportSection {
                temperature_json: Some(export.temperature_json),
                ndvi_json: Some(export.ndvi_json),
                temperature_csv: Some(export.temperature_csv),
                ndvi_csv: Some(export.ndvi_csv),
                summary_csv: Some(export.summary_csv),
            },
        }
    }

    pub fn region(&self) -> String {
        self.region.clone().unwrap_or_else(default_region)
    }

    /// Load the city table and apply the section's city selection, falling back on the
    /// top level selection.
    pub fn city_table(&self, section_names: Option<&[String]>) -> Result<CityTable, ConfigError> {
        let table = if let Some(f) = &self.cities_file {
            CityTable::load_file(f)?
        } else {
            CityTable::benin()
        };

        match section_names.or(self.city_names.as_deref()) {
            Some(names) => Ok(table.subset(names)?),
            None => Ok(table),
        }
    }

    pub fn raster_section(&self, dataset: RasterDataset) -> &RasterSection {
        match dataset {
            RasterDataset::Temperature => &self.temperature,
            RasterDataset::Ndvi => &self.ndvi,
            RasterDataset::SoilMoisture => &self.soil_moisture.raster,
            RasterDataset::SoilMoistureDaily => &self.soil_moisture_daily,
        }
    }

    pub fn raster_job(&self, dataset: RasterDataset) -> RasterJob {
        let section = self.raster_section(dataset);
        let d = dataset.defaults();
        RasterJob {
            region: self.region(),
            input_dir: section.input_dir.clone().unwrap_or_else(|| d.input_dir.into()),
            file_glob: section.file_glob.clone().unwrap_or_else(|| d.file_glob.to_string()),
            output_json: section.output_json.clone().unwrap_or_else(|| d.output_json.into()),
            output_csv: section.output_csv.clone().unwrap_or_else(|| d.output_csv.into()),
            timeseries_window: section.timeseries_window.unwrap_or(d.timeseries_window),
            sample_options: SampleOptions { zero_is_nodata: section.treat_zero_as_fill.unwrap_or(true) },
        }
    }

    pub fn soil_moisture_job(&self) -> SoilMoistureJob {
        let layers = self.soil_moisture.layers.clone()
            .unwrap_or_else(|| DEFAULT_SOIL_LAYERS.iter().map(|s| s.to_string()).collect());
        SoilMoistureJob { raster: self.raster_job(RasterDataset::SoilMoisture), layers }
    }

    pub fn tabular_job(&self) -> TabularJob {
        let s = &self.tabular_temperature;
        TabularJob {
            region: self.region(),
            input_dir: s.input_dir.clone().unwrap_or_else(|| "raw-nasa-data/temperature".into()),
            file_glob: s.file_glob.clone().unwrap_or_else(|| "*results*.csv".to_string()),
            fallback_dir: s.fallback_dir.clone().unwrap_or_else(|| "raw-nasa-data".into()),
            fallback_glob: s.fallback_glob.clone().unwrap_or_else(|| "*MOD11A2*results*.csv".to_string()),
            output_json: s.output_json.clone().unwrap_or_else(|| "public/data/nasa-temperature-benin.json".into()),
            output_csv: s.output_csv.clone().unwrap_or_else(|| "public/data/csv/nasa-temperature-benin.csv".into()),
            timeseries_window: s.timeseries_window.unwrap_or(5),
            max_match_distance_deg: s.max_match_distance_deg.unwrap_or(1.0),
        }
    }

    pub fn precipitation_job(&self) -> PrecipitationJob {
        let s = &self.precipitation;
        PrecipitationJob {
            region: self.region(),
            base_url: s.base_url.clone().unwrap_or_else(|| DEFAULT_POWER_URL.to_string()),
            start: s.start.unwrap_or_else(default_precip_start),
            end: s.end.unwrap_or_else(default_precip_end),
            timeout_secs: s.timeout_secs.unwrap_or(30),
            output_json: s.output_json.clone().unwrap_or_else(|| "public/data/nasa-precipitation-benin.json".into()),
            output_csv: s.output_csv.clone().unwrap_or_else(|| "public/data/csv/nasa-precipitation-benin.csv".into()),
        }
    }

    pub fn csv_export_job(&self) -> CsvExportJob {
        let s = &self.csv_export;
        CsvExportJob {
            temperature_json: s.temperature_json.clone().unwrap_or_else(|| "public/data/nasa-temperature-benin.json".into()),
            ndvi_json: s.ndvi_json.clone().unwrap_or_else(|| "public/data/nasa-ndvi-benin.json".into()),
            temperature_csv: s.temperature_csv.clone().unwrap_or_else(|| "public/data/csv/nasa-temperature-benin.csv".into()),
            ndvi_csv: s.ndvi_csv.clone().unwrap_or_else(|| "public/data/csv/nasa-ndvi-benin.csv".into()),
            summary_csv: s.summary_csv.clone().unwrap_or_else(|| "public/data/csv/nasa-benin-summary.csv".into()),
        }
    }

    fn make_paths_relative_to(&mut self, config_file: &Path) {
        let fix = |p: &mut Option<PathBuf>| {
            if let Some(inner) = p.take() {
                *p = Some(path_relative_to_config(config_file, inner));
            }
        };

        fix(&mut self.cities_file);
        for section in [&mut self.temperature, &mut self.ndvi, &mut self.soil_moisture.raster, &mut self.soil_moisture_daily] {
            fix(&mut section.input_dir);
            fix(&mut section.output_json);
            fix(&mut section.output_csv);
        }

        let tab = &mut self.tabular_temperature;
        fix(&mut tab.input_dir);
        fix(&mut tab.fallback_dir);
        fix(&mut tab.output_json);
        fix(&mut tab.output_csv);

        fix(&mut self.precipitation.output_json);
        fix(&mut self.precipitation.output_csv);

        let exp = &mut self.csv_export;
        fix(&mut exp.temperature_json);
        fix(&mut exp.ndvi_json);
        fix(&mut exp.temperature_csv);
        fix(&mut exp.ndvi_csv);
        fix(&mut exp.summary_csv);
    }
}

impl PrecipitationJob {
    pub fn check_dates(&self) -> Result<(), ConfigError> {
        if self.end < self.start {
            Err(ConfigError::Invalid(format!(
                "precipitation end date {} is before the start date {}", self.end, self.start
            )))
        } else {
            Ok(())
        }
    }
}

fn default_region() -> String {
    "Benin".to_string()
}

fn default_precip_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .expect("2025-01-01 is a valid date - this is a bug")
}

fn default_precip_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 31)
        .expect("2025-01-31 is a valid date - this is a bug")
}
