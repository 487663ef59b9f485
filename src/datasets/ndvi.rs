//! MODIS vegetation index rasters to the vegetation health document.
use chrono::NaiveDate;

use crate::{
    aggregate::CityAccumulator,
    cities::CityTable,
    classify::{classify_ndvi, NDVI_SCHEME},
    config::RasterJob,
    convert::{scale_ndvi, Product},
    doy::parse_doy_date_from_path,
    output::{ndvi_rows, NdviDocument, NdviInterpretation, NdviLocation, NdviPoint, Place, VegetationHealth},
};

use super::{discover_inputs, scan_rasters, write_outputs, DatasetError, DatasetResult};

pub const SOURCE: &str = "NASA MODIS NDVI";
pub const PRODUCT: &str = "Vegetation Health Index";
pub const RESOLUTION: &str = "250m or 500m";

pub fn convert_ndvi(job: &RasterJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<NdviDocument> {
    let doc = build_ndvi_document(job, cities, generated)?;
    write_outputs(&doc, &job.output_json, &ndvi_rows(&doc), &job.output_csv)?;
    Ok(doc)
}

pub fn build_ndvi_document(job: &RasterJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<NdviDocument> {
    let files = discover_inputs(&job.input_dir, &job.file_glob)?;
    let mut acc = CityAccumulator::new(cities);
    scan_rasters(&files, &mut acc, job.sample_options, parse_doy_date_from_path, scale_ndvi);
    if acc.n_samples() == 0 {
        return Err(DatasetError::NoValidSamples.into());
    }

    let precision = Product::Ndvi.precision();
    let locations = acc.finish(job.timeseries_window, precision)
        .into_iter()
        .map(|s| {
            let current = classify_ndvi(Some(s.aggregate.current));
            NdviLocation {
                place: Place::from(s.city),
                vegetation_health: VegetationHealth {
                    current_ndvi: s.aggregate.current,
                    average_ndvi: s.aggregate.average,
                    min_ndvi: s.aggregate.min,
                    max_ndvi: s.aggregate.max,
                    status: current.status.to_string(),
                    health_description: current.description.to_string(),
                    color: current.color.to_string(),
                },
                timeseries: s.recent.iter()
                    .map(|x| {
                        let c = classify_ndvi(Some(x.value));
                        NdviPoint {
                            date: x.date,
                            ndvi: x.value,
                            health: c.description.to_string(),
                            status: c.status.to_string(),
                            raw_value: Some(x.raw_value.round() as i64),
                        }
                    })
                    .collect(),
            }
        })
        .collect();

    let ranges = NDVI_SCHEME.range_labels()
        .iter()
        .map(|(range, meaning)| (range.to_string(), meaning.to_string()))
        .collect();

    Ok(NdviDocument {
        source: SOURCE.to_string(),
        product: PRODUCT.to_string(),
        resolution: RESOLUTION.to_string(),
        region: job.region.clone(),
        last_update: generated,
        locations,
        interpretation: NdviInterpretation { ranges },
    })
}

#[cfg(test)]
mod tests {
    use crate::{datasets::test_utils::*, raster::SampleOptions};

    use super::*;

    #[test]
    fn test_ndvi_document() {
        let dir = temp_dir("ndvi");
        write_benin_raster(&dir, "MOD13A1.061__500m_16_days_NDVI_doy2025001_aid0001.tif", 3900.0);
        write_benin_raster(&dir, "MOD13A1.061__500m_16_days_NDVI_doy2025017_aid0001.tif", 4000.0);
        // Fill value, dropped by the converter
        write_benin_raster(&dir, "MOD13A1.061__500m_16_days_NDVI_doy2025033_aid0001.tif", -3000.0);
        let job = RasterJob {
            region: "Benin".to_string(),
            input_dir: dir.clone(),
            file_glob: "*NDVI*.tif".to_string(),
            output_json: dir.join("ndvi.json"),
            output_csv: dir.join("ndvi.csv"),
            timeseries_window: 5,
            sample_options: SampleOptions::default(),
        };
        let generated = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let table = CityTable::benin().subset(&["Bohicon"]).unwrap();

        let doc = convert_ndvi(&job, &table, generated).unwrap();
        let n_csv_lines = std::fs::read_to_string(&job.output_csv).unwrap().lines().count();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(n_csv_lines, 3);
        let loc = &doc.locations[0];
        assert_eq!(loc.timeseries.len(), 2);
        assert_eq!(loc.vegetation_health.current_ndvi, 0.4);
        assert_eq!(loc.vegetation_health.average_ndvi, 0.395);
        assert_eq!(loc.vegetation_health.status, "moderate");
        assert_eq!(loc.vegetation_health.color, "lightgreen");
        assert_eq!(loc.timeseries[0].status, "poor");
        assert_eq!(loc.timeseries[0].raw_value, Some(3900));
        assert_eq!(doc.interpretation.ranges[0], ("< 0".to_string(), "Eau".to_string()));
    }
}
