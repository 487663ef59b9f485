//! Daily precipitation per city from NASA POWER to the precipitation document.
use std::collections::BTreeMap;

use chrono::NaiveDate;
use error_stack::ResultExt;

use crate::{
    cities::CityTable,
    config::PrecipitationJob,
    convert::precipitation_mm,
    output::{precipitation_rows, DateRange, Place, PrecipitationDocument, PrecipitationLocation, PrecipitationPoint, PrecipitationStats},
    power::{PowerApiClient, PrecipitationSource},
    round_to,
};

use super::{write_outputs, DatasetError, DatasetResult};

pub const SOURCE: &str = "NASA POWER API";
pub const PRODUCT: &str = "Precipitation Corrected (PRECTOTCORR)";
/// Days with more than this much precipitation (mm) count as rainy
pub const RAINY_DAY_THRESHOLD_MM: f64 = 0.1;

/// Download from the POWER API configured in `job` and write the document.
pub fn download_precipitation(job: &PrecipitationJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<PrecipitationDocument> {
    job.check_dates()
        .change_context(DatasetError::Download)?;
    let client = PowerApiClient::new(&job.base_url, job.timeout_secs)
        .change_context(DatasetError::Download)?;
    convert_precipitation(&client, job, cities, generated)
}

/// Fetch every city's series from `source` and write the document. A city whose request
/// fails is left out with a warning.
pub fn convert_precipitation<S: PrecipitationSource + ?Sized>(source: &S, job: &PrecipitationJob, cities: &CityTable, generated: NaiveDate)
-> DatasetResult<PrecipitationDocument> {
    log::info!("Fetching precipitation for {} cities from {} to {}", cities.len(), job.start, job.end);

    let mut locations = vec![];
    for city in cities {
        let daily = match source.daily_precipitation(city.latitude, city.longitude, job.start, job.end) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Skipping {} because the download failed: {e}", city.name);
                continue;
            }
        };

        let Some((precipitation, timeseries)) = summarize_daily(&daily) else {
            log::warn!("Skipping {} because POWER returned no valid days", city.name);
            continue;
        };

        log::info!("{}: {} days", city.name, timeseries.len());
        locations.push(PrecipitationLocation { place: Place::from(city), precipitation, timeseries });
    }

    if locations.is_empty() {
        return Err(DatasetError::NoValidSamples.into());
    }

    let doc = PrecipitationDocument {
        source: SOURCE.to_string(),
        product: PRODUCT.to_string(),
        region: job.region.clone(),
        date_range: DateRange { start: job.start, end: job.end },
        last_update: generated,
        locations,
    };
    write_outputs(&doc, &job.output_json, &precipitation_rows(&doc), &job.output_csv)?;
    Ok(doc)
}

/// Compute the period statistics and the per-day series. Fill values are skipped. Returns
/// `None` if no day has a valid value.
pub fn summarize_daily(daily: &BTreeMap<NaiveDate, f64>) -> Option<(PrecipitationStats, Vec<PrecipitationPoint>)> {
    let valid: Vec<(NaiveDate, f64)> = daily.iter()
        .filter(|(_, v)| precipitation_mm(**v).is_some())
        .map(|(d, v)| (*d, *v))
        .collect();

    if valid.is_empty() {
        return None;
    }

    let total: f64 = valid.iter().map(|(_, v)| v).sum();
    let max = valid.iter().fold(0.0_f64, |acc, (_, v)| acc.max(*v));
    let rainy_days = valid.iter().filter(|(_, v)| *v > RAINY_DAY_THRESHOLD_MM).count() as u32;

    let stats = PrecipitationStats {
        total_mm: round_to(total, 2),
        average_daily_mm: round_to(total / valid.len() as f64, 2),
        max_daily_mm: round_to(max, 2),
        rainy_days,
    };

    let points = valid.into_iter()
        .filter_map(|(date, v)| Some(PrecipitationPoint { date, precipitation_mm: precipitation_mm(v)? }))
        .collect();
    Some((stats, points))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{datasets::test_utils::temp_dir, power::PowerApiError};

    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    /// Canned responses keyed by latitude; other latitudes fail like a timed out request would.
    struct StubSource(HashMap<String, BTreeMap<NaiveDate, f64>>);

    impl PrecipitationSource for StubSource {
        fn daily_precipitation(&self, latitude: f64, _longitude: f64, _start: NaiveDate, _end: NaiveDate)
            -> Result<BTreeMap<NaiveDate, f64>, PowerApiError> {
            self.0.get(&latitude.to_string())
                .cloned()
                .ok_or(PowerApiError::MissingParameter("PRECTOTCORR"))
        }
    }

    #[test]
    fn test_summary() {
        let daily = BTreeMap::from([(d(1), 0.0), (d(2), 12.345), (d(3), 0.1), (d(4), -999.0), (d(5), 3.0)]);
        let (stats, points) = summarize_daily(&daily).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[1].precipitation_mm, 12.35);
        assert_eq!(stats.total_mm, 15.45);
        assert_eq!(stats.average_daily_mm, 3.86);
        assert_eq!(stats.max_daily_mm, 12.35);
        assert_eq!(stats.rainy_days, 2);

        let dry = BTreeMap::from([(d(1), 0.0)]);
        assert_eq!(summarize_daily(&dry).unwrap().0.max_daily_mm, 0.0);
        assert!(summarize_daily(&BTreeMap::from([(d(1), -999.0)])).is_none());
    }

    #[test]
    fn test_failed_city_is_skipped() {
        let dir = temp_dir("precip");
        let table = CityTable::benin().subset(&["Cotonou", "Parakou"]).unwrap();
        let stub = StubSource(HashMap::from([
            ("6.3667".to_string(), BTreeMap::from([(d(1), 1.0), (d(2), 2.0)])),
        ]));
        let job = PrecipitationJob {
            region: "Benin".to_string(),
            base_url: "http://localhost".to_string(),
            start: d(1),
            end: d(2),
            timeout_secs: 1,
            output_json: dir.join("precip.json"),
            output_csv: dir.join("csv").join("precip.csv"),
        };

        let doc = convert_precipitation(&stub, &job, &table, d(3)).unwrap();
        let csv = std::fs::read_to_string(&job.output_csv).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(doc.locations.len(), 1);
        assert_eq!(doc.locations[0].place.city, "Cotonou");
        assert_eq!(doc.locations[0].precipitation.total_mm, 3.0);
        assert_eq!(doc.date_range.end, d(2));
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("City,Country,Latitude,Longitude,Date,Precipitation_mm,Total_mm"));
    }

    #[test]
    fn test_all_failed() {
        let stub = StubSource(HashMap::new());
        let job = crate::config::ConvertConfig::default().precipitation_job();
        let err = convert_precipitation(&stub, &job, &CityTable::benin(), d(3)).unwrap_err();
        assert!(matches!(err.current_context(), DatasetError::NoValidSamples));
    }
}
