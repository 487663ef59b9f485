//! Regenerate the CSV tables from already written temperature and NDVI documents.
use std::path::Path;

use error_stack::ResultExt;
use serde::de::DeserializeOwned;

use crate::{
    config::CsvExportJob,
    output::{ndvi_rows, read_json, summary_rows, temperature_rows, write_csv, NdviDocument, TemperatureDocument},
};

use super::{DatasetError, DatasetResult};

/// Number of data rows written to each table, `None` for tables that were skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportCounts {
    pub temperature: Option<usize>,
    pub ndvi: Option<usize>,
    pub summary: Option<usize>,
}

/// Write the per-dataset tables for whichever documents exist, and the summary table if
/// both do. A missing document is not an error; one that cannot be parsed is.
pub fn export_csv(job: &CsvExportJob) -> DatasetResult<ExportCounts> {
    let mut counts = ExportCounts::default();

    let temperature: Option<TemperatureDocument> = read_if_present(&job.temperature_json)?;
    if let Some(doc) = &temperature {
        counts.temperature = Some(write_table(&job.temperature_csv, &temperature_rows(doc))?);
    }

    let ndvi: Option<NdviDocument> = read_if_present(&job.ndvi_json)?;
    if let Some(doc) = &ndvi {
        counts.ndvi = Some(write_table(&job.ndvi_csv, &ndvi_rows(doc))?);
    }

    match (&temperature, &ndvi) {
        (Some(t), Some(n)) => {
            counts.summary = Some(write_table(&job.summary_csv, &summary_rows(t, n))?);
        },
        _ => log::warn!("The summary table needs both the temperature and NDVI documents, it was not written"),
    }

    Ok(counts)
}

fn read_if_present<T: DeserializeOwned>(path: &Path) -> DatasetResult<Option<T>> {
    if !path.exists() {
        log::warn!("{} not found, skipping its table", path.display());
        return Ok(None);
    }

    let doc = read_json(path)
        .change_context_lazy(|| DatasetError::ReadInput(path.to_path_buf()))?;
    log::info!("Read {}", path.display());
    Ok(Some(doc))
}

fn write_table<R: serde::Serialize>(path: &Path, rows: &[R]) -> DatasetResult<usize> {
    let n = write_csv(path, rows)
        .change_context_lazy(|| DatasetError::WriteOutput(path.to_path_buf()))?;
    log::info!("Wrote {} ({n} rows)", path.display());
    Ok(n)
}

#[cfg(test)]
mod tests {
    use crate::datasets::test_utils::temp_dir;

    use super::*;

    const TEMPERATURE_JSON: &str = r#"{
        "source": "NASA MODIS MOD11A2.061",
        "product": "Land Surface Temperature (8-Day)",
        "region": "Benin",
        "lastUpdate": "2025-02-01",
        "locations": [
            {"city": "Cotonou", "country": "Benin", "latitude": 6.3667, "longitude": 2.3833,
             "temperature": {"average_c": 30.5, "min_c": 30.0, "max_c": 31.0, "current_c": 31.0},
             "timeseries": [{"date": "2025-01-01", "temperature_c": 30.0}, {"date": "2025-01-09", "temperature_c": 31.0}]},
            {"city": "Kandi", "country": "Benin", "latitude": 11.1342, "longitude": 2.9386,
             "temperature": {"average_c": 35.0, "min_c": 35.0, "max_c": 35.0, "current_c": 35.0},
             "timeseries": [{"date": "2025-01-09", "temperature_c": 35.0}]}
        ]
    }"#;

    const NDVI_JSON: &str = r#"{
        "source": "NASA MODIS NDVI",
        "product": "Vegetation Health Index",
        "resolution": "250m or 500m",
        "region": "Benin",
        "lastUpdate": "2025-02-01",
        "locations": [
            {"city": "Cotonou", "country": "Benin", "latitude": 6.3667, "longitude": 2.3833,
             "vegetation_health": {"current_ndvi": 0.45, "average_ndvi": 0.4, "min_ndvi": 0.35, "max_ndvi": 0.45,
                                   "status": "moderate", "health_description": "Bonne santé", "color": "lightgreen"},
             "timeseries": [{"date": "2025-01-17", "ndvi": 0.45, "health": "Bonne santé", "status": "moderate", "raw_value": 4500}]}
        ],
        "interpretation": {"ranges": {"< 0": "Eau"}}
    }"#;

    fn job_for(dir: &Path) -> CsvExportJob {
        CsvExportJob {
            temperature_json: dir.join("nasa-temperature-benin.json"),
            ndvi_json: dir.join("nasa-ndvi-benin.json"),
            temperature_csv: dir.join("csv").join("nasa-temperature-benin.csv"),
            ndvi_csv: dir.join("csv").join("nasa-ndvi-benin.csv"),
            summary_csv: dir.join("csv").join("nasa-benin-summary.csv"),
        }
    }

    #[test]
    fn test_missing_ndvi_skips_summary() {
        let dir = temp_dir("export-partial");
        let job = job_for(&dir);
        std::fs::write(&job.temperature_json, TEMPERATURE_JSON).unwrap();

        let counts = export_csv(&job).unwrap();
        let summary_exists = job.summary_csv.exists();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(counts, ExportCounts { temperature: Some(3), ndvi: None, summary: None });
        assert!(!summary_exists);
    }

    #[test]
    fn test_full_export() {
        let dir = temp_dir("export-full");
        let job = job_for(&dir);
        std::fs::write(&job.temperature_json, TEMPERATURE_JSON).unwrap();
        std::fs::write(&job.ndvi_json, NDVI_JSON).unwrap();

        let counts = export_csv(&job).unwrap();
        let summary = std::fs::read_to_string(&job.summary_csv).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(counts, ExportCounts { temperature: Some(3), ndvi: Some(1), summary: Some(2) });
        let lines: Vec<&str> = summary.lines().collect();
        assert!(lines[1].starts_with("Cotonou,Benin,"));
        assert!(lines[1].ends_with(",0.45,0.4,moderate,Bonne santé"));
        assert!(lines[2].starts_with("Kandi,Benin,"));
        assert!(lines[2].ends_with(",,,,"));
    }

    #[test]
    fn test_malformed_document() {
        let dir = temp_dir("export-bad");
        let job = job_for(&dir);
        std::fs::write(&job.temperature_json, "{ not json").unwrap();

        let err = export_csv(&job).unwrap_err();
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(err.current_context(), DatasetError::ReadInput(_)));
    }
}
