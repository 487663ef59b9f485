//! SMAP L4 3-hourly root zone soil moisture rasters, averaged to daily values.
use chrono::NaiveDate;

use crate::{
    aggregate::{CityAccumulator, CitySeries},
    cities::CityTable,
    classify::{classify_daily_soil_moisture, DAILY_SOIL_MOISTURE_SCHEME},
    config::{RasterJob, DEFAULT_SOIL_LAYERS},
    convert::soil_moisture_fraction,
    doy::parse_doy_datetime_from_path,
    output::{DailyCurrent, DailyLayer, DailyLocation, DailyPoint, DailySoilMoistureDocument, DailySoilMoistureRow, DailyStatistics, DataAccess},
    round_to,
    utils::{identify_layer, is_duplicate_download},
};

use super::{discover_inputs, scan_rasters, write_outputs, DatasetError, DatasetResult};

pub const SOURCE: &str = "NASA SMAP Level 4 Global Surface and Root Zone Soil Moisture";
pub const PRODUCT: &str = "SPL4SMGP v008";
pub const DESCRIPTION: &str = "Soil moisture data derived from SMAP satellite measurements - Converted from GeoTIFF";
pub const SPATIAL_RESOLUTION: &str = "9 km";
pub const TEMPORAL_RESOLUTION: &str = "3-hourly, aggregated to daily";
pub const UNIT: &str = "m³/m³";
pub const DATA_API: &str = "https://n5eil01u.ecs.nsidc.org/SMAP/SPL4SMGP.008/";
pub const DATA_DOCUMENTATION: &str = "https://nsidc.org/data/spl4smgp/versions/8";

/// Layer name used when the file names do not say which layer they hold
const UNKNOWN_LAYER: &str = "soil_moisture";
/// Daily means of the volumetric fraction keep this many decimals
const VOLUMETRIC_PRECISION: u32 = 3;
const PERCENT_PRECISION: u32 = 1;

fn layer_description(layer: &str) -> String {
    match layer {
        "sm_rootzone" => "Root zone soil moisture (0-100 cm depth) - averaged daily".to_string(),
        "sm_surface" => "Surface soil moisture (0-5 cm depth) - averaged daily".to_string(),
        other => format!("{other} - averaged daily"),
    }
}

fn to_percent(volumetric: f64) -> f64 {
    round_to(volumetric * 100.0, PERCENT_PRECISION)
}

/// Build the daily document and write it. The CSV holds every day of the series, not only
/// the days kept in the document.
pub fn convert_soil_moisture_daily(job: &RasterJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<DailySoilMoistureDocument> {
    let files = discover_inputs(&job.input_dir, &job.file_glob)?;
    let n_found = files.len();
    let files: Vec<_> = files.into_iter()
        .filter(|f| !is_duplicate_download(f))
        .collect();
    if files.len() < n_found {
        log::info!("Skipping {} duplicate downloads", n_found - files.len());
    }
    if files.is_empty() {
        return Err(DatasetError::NoInputFiles { dir: job.input_dir.clone(), pattern: job.file_glob.clone() }.into());
    }

    let layer = identify_layer(&files[0], &DEFAULT_SOIL_LAYERS).unwrap_or(UNKNOWN_LAYER);

    let mut acc = CityAccumulator::new(cities);
    scan_rasters(
        &files,
        &mut acc,
        job.sample_options,
        |p| parse_doy_datetime_from_path(p).map(|dt| dt.date()),
        soil_moisture_fraction
    );
    if acc.n_samples() == 0 {
        return Err(DatasetError::NoValidSamples.into());
    }

    let series = acc.into_daily_means(VOLUMETRIC_PRECISION)
        .finish(usize::MAX, VOLUMETRIC_PRECISION);

    let doc = daily_document(&series, layer, job.timeseries_window, &job.region, cities.len(), generated);
    let rows = daily_rows(&series);
    write_outputs(&doc, &job.output_json, &rows, &job.output_csv)?;
    Ok(doc)
}

fn daily_statistics(s: &CitySeries) -> DailyStatistics {
    DailyStatistics {
        average_percent: to_percent(s.aggregate.average),
        min_percent: to_percent(s.aggregate.min),
        max_percent: to_percent(s.aggregate.max),
    }
}

/// `series` must hold the full daily series of each city; only the last `window` days are kept.
fn daily_document(series: &[CitySeries], layer: &str, window: usize, region: &str, n_cities: usize, generated: NaiveDate) -> DailySoilMoistureDocument {
    let locations = series.iter()
        .map(|s| {
            let (latest_date, latest) = s.recent.last()
                .map(|x| (x.date, x.value))
                .unwrap_or((generated, s.aggregate.current));
            let skip = s.recent.len().saturating_sub(window);

            DailyLocation {
                city: s.city.name.clone(),
                latitude: s.city.latitude,
                longitude: s.city.longitude,
                region: s.city.region.clone(),
                soil_type: s.city.soil_type.clone(),
                current: DailyCurrent {
                    volumetric: latest,
                    percentage: to_percent(latest),
                    status: classify_daily_soil_moisture(Some(latest * 100.0)).status.to_string(),
                    timestamp: format!("{latest_date}T12:00:00Z"),
                },
                statistics: daily_statistics(s),
                timeseries: s.recent.iter()
                    .skip(skip)
                    .map(|x| DailyPoint { date: x.date, value: x.value, percent: to_percent(x.value) })
                    .collect(),
            }
        })
        .collect();

    let interpretation = DAILY_SOIL_MOISTURE_SCHEME.range_labels()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    DailySoilMoistureDocument {
        source: SOURCE.to_string(),
        product: PRODUCT.to_string(),
        description: DESCRIPTION.to_string(),
        spatial_resolution: SPATIAL_RESOLUTION.to_string(),
        temporal_resolution: TEMPORAL_RESOLUTION.to_string(),
        units: vec![
            ("surface_sm".to_string(), "volumetric fraction (m³/m³)".to_string()),
            ("rootzone_sm".to_string(), "volumetric fraction (m³/m³)".to_string()),
            ("percentage".to_string(), "converted to percentage for user display".to_string()),
        ],
        last_update: generated,
        coverage: format!("{region} - {n_cities} major cities"),
        layers: vec![(layer.to_string(), DailyLayer {
            description: layer_description(layer),
            unit: UNIT.to_string(),
            locations,
        })],
        interpretation,
        data_access: DataAccess {
            api: DATA_API.to_string(),
            documentation: DATA_DOCUMENTATION.to_string(),
            earthdata_login_required: true,
        },
    }
}

fn daily_rows(series: &[CitySeries]) -> Vec<DailySoilMoistureRow> {
    let mut rows = vec![];
    for s in series {
        let stats = daily_statistics(s);
        let current_percent = to_percent(s.aggregate.current);
        for x in s.recent.iter() {
            rows.push(DailySoilMoistureRow {
                date: x.date,
                city: s.city.name.clone(),
                region: s.city.region.clone(),
                latitude: s.city.latitude,
                longitude: s.city.longitude,
                soil_type: s.city.soil_type.clone(),
                soil_moisture_volumetric: x.value,
                soil_moisture_percent: to_percent(x.value),
                status: classify_daily_soil_moisture(Some(x.value * 100.0)).status.to_string(),
                current_percent,
                average_percent: stats.average_percent,
                min_percent: stats.min_percent,
                max_percent: stats.max_percent,
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use crate::{datasets::test_utils::*, raster::SampleOptions};

    use super::*;

    #[test]
    fn test_daily_means_and_window() {
        let dir = temp_dir("smap-daily");
        let stem = "SPL4SMGP.008_Geophysical_Data_sm_rootzone";
        // Two 3-hourly values on Jan 1st, one on each of Jan 2nd and 3rd
        write_benin_raster(&dir, &format!("{stem}_doy2025001013000_aid0001.tif"), 0.20);
        write_benin_raster(&dir, &format!("{stem}_doy2025001043000_aid0001.tif"), 0.30);
        write_benin_raster(&dir, &format!("{stem}_doy2025002013000_aid0001.tif"), 0.10);
        write_benin_raster(&dir, &format!("{stem}_doy2025003013000_aid0001.tif"), 0.30);
        write_benin_raster(&dir, &format!("{stem}_doy2025003013000_aid0001 (1).tif"), 0.90);
        let job = RasterJob {
            region: "Benin".to_string(),
            input_dir: dir.clone(),
            file_glob: "*sm_rootzone*.tif".to_string(),
            output_json: dir.join("daily.json"),
            output_csv: dir.join("daily.csv"),
            timeseries_window: 2,
            sample_options: SampleOptions::default(),
        };
        let generated = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        let table = CityTable::benin().subset(&["Malanville"]).unwrap();

        let doc = convert_soil_moisture_daily(&job, &table, generated).unwrap();
        let csv = std::fs::read_to_string(&job.output_csv).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(doc.coverage, "Benin - 1 major cities");
        let (name, layer) = &doc.layers[0];
        assert_eq!(name, "sm_rootzone");
        let loc = &layer.locations[0];
        assert_eq!(loc.region.as_deref(), Some("Alibori"));
        assert_eq!(loc.soil_type.as_deref(), Some("alluvial"));
        assert_eq!(loc.timeseries.len(), 2);
        assert_eq!(loc.timeseries[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(loc.current.volumetric, 0.3);
        assert_eq!(loc.current.percentage, 30.0);
        assert_eq!(loc.current.status, "optimal");
        assert_eq!(loc.current.timestamp, "2025-01-03T12:00:00Z");
        assert_eq!(loc.statistics.min_percent, 10.0);
        assert_eq!(loc.statistics.max_percent, 30.0);
        assert_eq!(loc.statistics.average_percent, 21.7);

        // The CSV keeps all three days
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("date,city,region,latitude,longitude,soil_type,soil_moisture_volumetric"));
        assert!(lines[1].starts_with("2025-01-01,Malanville,Alibori,"));
        assert!(lines[2].contains(",very_dry,"));
    }
}
