//! AppEEARS point sample CSV files to the temperature document.
//!
//! Each row of such a file is one sample at one point. Rows are assigned to the nearest city,
//! and rows too far from every city are dropped.
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use error_stack::ResultExt;

use crate::{
    aggregate::{CityAccumulator, Sample},
    cities::CityTable,
    config::TabularJob,
    convert::kelvin_to_celsius,
    output::{temperature_rows, TemperatureDocument},
    utils::find_files,
};

use super::{temperature::temperature_document, write_outputs, DatasetError, DatasetResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Indices of the columns used from the CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    latitude: usize,
    longitude: usize,
    date: usize,
    value: usize,
}

impl Columns {
    /// Find the columns by loose name matching: the first column whose lower case name contains
    /// "lat", "lon" or "date", and the first column containing "LST_Day", or failing that "LST".
    fn detect(headers: &StringRecord) -> Result<Self, String> {
        let find_lower = |part: &str| headers.iter().position(|h| h.to_lowercase().contains(part));
        let find = |part: &str| headers.iter().position(|h| h.contains(part));

        match (find_lower("lat"), find_lower("lon"), find_lower("date")) {
            (Some(latitude), Some(longitude), Some(date)) => {
                let value = find("LST_Day").or_else(|| find("LST"))
                    .ok_or_else(|| format!("no LST column among {}", headers.iter().collect::<Vec<_>>().join(", ")))?;
                Ok(Self { latitude, longitude, date, value })
            },
            _ => Err(format!(
                "could not find latitude, longitude and date columns among {}",
                headers.iter().collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

pub fn convert_tabular_temperature(job: &TabularJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<TemperatureDocument> {
    let csv_file = find_tabular_input(job)?;
    let mut acc = CityAccumulator::new(cities);
    read_tabular_file(&csv_file, &mut acc, job.max_match_distance_deg)?;
    let doc = temperature_document(acc, job.timeseries_window, None, &job.region, generated)?;
    write_outputs(&doc, &job.output_json, &temperature_rows(&doc), &job.output_csv)?;
    Ok(doc)
}

/// The first file matching in the input directory, or else in the fallback directory.
fn find_tabular_input(job: &TabularJob) -> DatasetResult<PathBuf> {
    for (dir, pattern) in [(&job.input_dir, &job.file_glob), (&job.fallback_dir, &job.fallback_glob)] {
        match find_files(dir, pattern) {
            Ok((files, _)) if !files.is_empty() => {
                if files.len() > 1 {
                    log::warn!("{} files match '{pattern}' in {}, only the first is used", files.len(), dir.display());
                }
                if let Some(f) = files.into_iter().next() {
                    log::info!("Using {}", f.display());
                    return Ok(f);
                }
            },
            Ok(_) => log::debug!("No files matching '{pattern}' in {}", dir.display()),
            Err(e) => log::debug!("{e}"),
        }
    }

    Err(DatasetError::NoInputFiles { dir: job.input_dir.clone(), pattern: job.file_glob.clone() })
        .attach_printable_lazy(|| format!(
            "also searched for '{}' in {}", job.fallback_glob, job.fallback_dir.display()
        ))
}

fn read_tabular_file(csv_file: &Path, acc: &mut CityAccumulator, max_distance_deg: f64) -> DatasetResult<()> {
    let f = std::fs::File::open(csv_file)
        .change_context_lazy(|| DatasetError::ReadInput(csv_file.to_path_buf()))?;
    read_tabular_inner(f, csv_file, acc, max_distance_deg)
}

fn read_tabular_inner<R: std::io::Read>(input: R, csv_file: &Path, acc: &mut CityAccumulator, max_distance_deg: f64) -> DatasetResult<()> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = rdr.headers()
        .change_context_lazy(|| DatasetError::ReadInput(csv_file.to_path_buf()))?
        .clone();
    let columns = Columns::detect(&headers)
        .map_err(|reason| DatasetError::BadInput(csv_file.to_path_buf(), reason))?;
    log::debug!(
        "Using columns {}, {}, {} and {}",
        &headers[columns.latitude], &headers[columns.longitude], &headers[columns.date], &headers[columns.value]
    );

    let cities = acc.cities();
    let mut n_rows = 0;
    let mut n_unmatched = 0;
    let mut n_invalid = 0;
    for (idx, row) in rdr.records().enumerate() {
        let row = row.change_context_lazy(|| DatasetError::ReadInput(csv_file.to_path_buf()))
            .attach_printable_lazy(|| format!("error on data line #{}", idx + 1))?;
        n_rows += 1;

        let field = |i: usize| row.get(i).unwrap_or("");
        let (lat, lon) = match (field(columns.latitude).parse::<f64>(), field(columns.longitude).parse::<f64>()) {
            (Ok(lat), Ok(lon)) => (lat, lon),
            _ => {
                log::debug!("Data line #{}: unreadable coordinates", idx + 1);
                n_invalid += 1;
                continue;
            }
        };

        let Some(city) = cities.nearest(lat, lon, max_distance_deg) else {
            n_unmatched += 1;
            continue;
        };

        let date = match NaiveDate::parse_from_str(field(columns.date), DATE_FORMAT) {
            Ok(d) => d,
            Err(_) => {
                log::warn!("Skipping data line #{} because '{}' is not a {DATE_FORMAT} date", idx + 1, field(columns.date));
                n_invalid += 1;
                continue;
            }
        };

        let converted = field(columns.value).parse::<f64>().ok()
            .and_then(|raw| kelvin_to_celsius(raw).map(|celsius| (raw, celsius)));
        match converted {
            Some((raw, celsius)) => {
                acc.push_named(&city.name, Sample::new(date, raw, celsius));
            },
            None => n_invalid += 1,
        }
    }

    log::info!(
        "{n_rows} rows read: {} samples, {n_unmatched} more than {max_distance_deg} degrees from every city, {n_invalid} without a valid value",
        acc.n_samples()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::datasets::test_utils::temp_dir;

    use super::*;

    const APPEEARS_CSV: &str = "\
ID,Category,Latitude,Longitude,Date,MODIS_Tile,MOD11A2_061_LST_Night_1km,MOD11A2_061_LST_Day_1km
p1,benin,6.37,2.38,2025-01-09,h18v08,14700,15200
p1,benin,6.37,2.38,2025-01-01,h18v08,14650,15100
p2,benin,9.34,2.61,2025-01-01,h18v08,14500,0
p3,benin,14.50,2.00,2025-01-01,h18v07,14000,15000
p4,benin,7.18,2.07,not-a-date,h18v08,14000,15000
";

    #[test]
    fn test_detect_columns() {
        let headers = StringRecord::from(vec!["ID", "Latitude", "Longitude", "Date", "MOD11A2_061_LST_Night_1km", "MOD11A2_061_LST_Day_1km"]);
        let c = Columns::detect(&headers).unwrap();
        assert_eq!(c, Columns { latitude: 1, longitude: 2, date: 3, value: 5 });

        let headers = StringRecord::from(vec!["lat", "lon", "date", "LST"]);
        assert_eq!(Columns::detect(&headers).unwrap().value, 3);

        let headers = StringRecord::from(vec!["lat", "lon", "time", "LST"]);
        assert!(Columns::detect(&headers).is_err());
    }

    #[test]
    fn test_read_rows() {
        let table = CityTable::benin();
        let mut acc = CityAccumulator::new(&table);
        read_tabular_inner(APPEEARS_CSV.as_bytes(), Path::new("test.csv"), &mut acc, 1.0).unwrap();
        // Only the two Cotonou rows are valid: p2 is fill, p3 is too far away, p4 has no date
        assert_eq!(acc.n_samples(), 2);

        let series = acc.finish(5, 2);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].city.name, "Cotonou");
        assert_eq!(series[0].recent[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(series[0].aggregate.current, kelvin_to_celsius(15200.0).unwrap());
    }

    #[test]
    fn test_fallback_dir() {
        let dir = temp_dir("tabular");
        let fallback = dir.join("raw");
        std::fs::create_dir_all(&fallback).unwrap();
        std::fs::write(fallback.join("Benin-MOD11A2-061-results.csv"), APPEEARS_CSV).unwrap();
        let job = TabularJob {
            region: "Benin".to_string(),
            input_dir: dir.join("temperature"),
            file_glob: "*results*.csv".to_string(),
            fallback_dir: fallback,
            fallback_glob: "*MOD11A2*results*.csv".to_string(),
            output_json: dir.join("out.json"),
            output_csv: dir.join("out.csv"),
            timeseries_window: 5,
            max_match_distance_deg: 1.0,
        };
        let generated = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

        let doc = convert_tabular_temperature(&job, &CityTable::benin(), generated).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(doc.resolution.is_none());
        assert_eq!(doc.locations.len(), 1);
        assert_eq!(doc.locations[0].timeseries.len(), 2);
    }
}
