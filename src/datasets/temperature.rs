//! MODIS land surface temperature rasters to the temperature document.
use chrono::NaiveDate;

use crate::{
    aggregate::CityAccumulator,
    cities::CityTable,
    config::RasterJob,
    convert::{kelvin_to_celsius, lst_to_celsius, Product},
    doy::parse_doy_date_from_path,
    output::{temperature_rows, DateRange, Place, TemperatureDocument, TemperatureLocation, TemperaturePoint, TemperatureStats},
};

use super::{discover_inputs, scan_rasters, write_outputs, DatasetError, DatasetResult};

pub const SOURCE: &str = "NASA MODIS MOD11A2.061";
pub const PRODUCT: &str = "Land Surface Temperature (8-Day)";
pub const RESOLUTION: &str = "1km";

/// Build the temperature document from the rasters described by `job` and write it with its CSV table.
pub fn convert_temperature(job: &RasterJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<TemperatureDocument> {
    let doc = build_temperature_document(job, cities, generated)?;
    write_outputs(&doc, &job.output_json, &temperature_rows(&doc), &job.output_csv)?;
    Ok(doc)
}

pub fn build_temperature_document(job: &RasterJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<TemperatureDocument> {
    let files = discover_inputs(&job.input_dir, &job.file_glob)?;
    let mut acc = CityAccumulator::new(cities);
    let convert = if job.sample_options.zero_is_nodata { kelvin_to_celsius } else { lst_to_celsius };
    scan_rasters(&files, &mut acc, job.sample_options, parse_doy_date_from_path, convert);
    temperature_document(acc, job.timeseries_window, Some(RESOLUTION), &job.region, generated)
}

/// Aggregate the collected temperatures into a document. Shared with the tabular converter,
/// which has no fixed resolution.
pub(crate) fn temperature_document(acc: CityAccumulator, window: usize, resolution: Option<&str>, region: &str, generated: NaiveDate) -> DatasetResult<TemperatureDocument> {
    let (start, end) = acc.date_range()
        .ok_or(DatasetError::NoValidSamples)?;

    let locations = acc.finish(window, Product::LandSurfaceTemperature.precision())
        .into_iter()
        .map(|s| TemperatureLocation {
            place: Place::from(s.city),
            temperature: TemperatureStats {
                average_c: s.aggregate.average,
                min_c: s.aggregate.min,
                max_c: s.aggregate.max,
                current_c: s.aggregate.current,
            },
            timeseries: s.recent.iter()
                .map(|x| TemperaturePoint { date: x.date, temperature_c: x.value, raw_value: Some(x.raw_value.round() as i64) })
                .collect(),
        })
        .collect();

    Ok(TemperatureDocument {
        source: SOURCE.to_string(),
        product: PRODUCT.to_string(),
        resolution: resolution.map(|r| r.to_string()),
        region: region.to_string(),
        date_range: Some(DateRange { start, end }),
        last_update: generated,
        locations,
    })
}

#[cfg(test)]
mod tests {
    use crate::{datasets::test_utils::*, raster::SampleOptions, round_to};

    use super::*;

    fn job_for(dir: &std::path::Path) -> RasterJob {
        RasterJob {
            region: "Benin".to_string(),
            input_dir: dir.to_path_buf(),
            file_glob: "*LST_Day_1km*.tif".to_string(),
            output_json: dir.join("out").join("nasa-temperature-benin.json"),
            output_csv: dir.join("out").join("csv").join("nasa-temperature-benin.csv"),
            timeseries_window: 5,
            sample_options: SampleOptions::default(),
        }
    }

    fn generated() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    #[test]
    fn test_two_dates_end_to_end() {
        let dir = temp_dir("temperature-e2e");
        // Written in reverse order to check the series is sorted by date, not by discovery
        write_benin_raster(&dir, "MOD11A2.061_LST_Day_1km_doy2025009_aid0001.tif", 13750.0);
        write_benin_raster(&dir, "MOD11A2.061_LST_Day_1km_doy2025001_aid0001.tif", 13700.0);
        let table = CityTable::benin().subset(&["Cotonou", "Parakou"]).unwrap();
        let job = job_for(&dir);

        let doc = convert_temperature(&job, &table, generated()).unwrap();
        let csv = std::fs::read_to_string(&job.output_csv).unwrap();
        let json_exists = job.output_json.exists();
        std::fs::remove_dir_all(&dir).unwrap();

        let first = kelvin_to_celsius(13700.0).unwrap();
        let second = kelvin_to_celsius(13750.0).unwrap();

        assert!(json_exists);
        assert_eq!(doc.locations.len(), 2);
        assert_eq!(doc.date_range, Some(DateRange {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
        }));
        let cotonou = &doc.locations[0];
        assert_eq!(cotonou.place.city, "Cotonou");
        assert_eq!(cotonou.temperature.current_c, second);
        assert_eq!(cotonou.temperature.average_c, round_to((first + second) / 2.0, 2));
        assert_eq!(cotonou.temperature.min_c, first);
        assert_eq!(cotonou.timeseries[0].raw_value, Some(13700));

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "City,Country,Latitude,Longitude,Date,Temperature_C,Raw_Value,Average_C,Min_C,Max_C,Current_C");
        assert!(lines[1].starts_with("Cotonou,Benin,6.3667,2.3833,2025-01-01,"));
    }

    #[test]
    fn test_no_valid_samples_writes_nothing() {
        let dir = temp_dir("temperature-empty");
        write_benin_raster(&dir, "MOD11A2.061_LST_Day_1km_doy2025001_aid0001.tif", 0.0);
        let job = job_for(&dir);

        let err = convert_temperature(&job, &CityTable::benin(), generated()).unwrap_err();
        let json_exists = job.output_json.exists();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(err.current_context(), DatasetError::NoValidSamples));
        assert!(!json_exists);
    }

    #[test]
    fn test_zero_kept_when_not_fill() {
        let dir = temp_dir("temperature-keep-zero");
        write_benin_raster(&dir, "MOD11A2.061_LST_Day_1km_doy2025001_aid0001.tif", 0.0);
        let mut job = job_for(&dir);
        job.sample_options = SampleOptions { zero_is_nodata: false };

        let doc = build_temperature_document(&job, &CityTable::benin().subset(&["Cotonou"]).unwrap(), generated()).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(doc.locations.len(), 1);
        assert_eq!(doc.locations[0].temperature.current_c, -273.15);
        assert_eq!(doc.locations[0].timeseries[0].raw_value, Some(0));
    }

    #[test]
    fn test_missing_input_dir() {
        let job = job_for(std::path::Path::new("/no/such/eo-city-rs/dir"));
        let err = convert_temperature(&job, &CityTable::benin(), generated()).unwrap_err();
        assert!(matches!(err.current_context(), DatasetError::Discovery));
    }
}
