//! SMAP L4 3-hourly soil moisture rasters to the multi-layer soil moisture document.
//!
//! The input directory holds files for several geophysical layers; each configured layer
//! gets its own section in the document.
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::{
    aggregate::CityAccumulator,
    cities::CityTable,
    classify::classify_soil_moisture,
    config::SoilMoistureJob,
    convert::{soil_moisture_percent, Product},
    doy::parse_doy_date_from_path,
    output::{soil_moisture_rows, MoistureStats, MoistureStatus, MoisturePoint, Place, SoilMoistureDocument, SoilMoistureLayer, SoilMoistureLocation},
    utils::identify_layer,
};

use super::{discover_inputs, scan_rasters, write_outputs, DatasetError, DatasetResult};

pub const SOURCE: &str = "SMAP SPL4SMGP.008";
pub const PRODUCT: &str = "Soil Moisture";
pub const UNIT: &str = "percent";

/// Human readable description of a SMAP layer
pub fn layer_description(layer: &str) -> &str {
    match layer {
        "sm_surface" => "Humidité du sol en surface (0-5cm)",
        "sm_rootzone" => "Humidité du sol en zone racinaire (0-100cm)",
        other => other,
    }
}

pub fn convert_soil_moisture(job: &SoilMoistureJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<SoilMoistureDocument> {
    let doc = build_soil_moisture_document(job, cities, generated)?;
    let raster = &job.raster;
    write_outputs(&doc, &raster.output_json, &soil_moisture_rows(&doc), &raster.output_csv)?;
    Ok(doc)
}

pub fn build_soil_moisture_document(job: &SoilMoistureJob, cities: &CityTable, generated: NaiveDate) -> DatasetResult<SoilMoistureDocument> {
    let raster = &job.raster;
    let files = discover_inputs(&raster.input_dir, &raster.file_glob)?;

    let mut layer_files: Vec<Vec<PathBuf>> = job.layers.iter().map(|_| Vec::new()).collect();
    let mut n_other = 0;
    for f in files {
        match identify_layer(&f, &job.layers).and_then(|l| job.layers.iter().position(|x| x == l)) {
            Some(i) => layer_files[i].push(f),
            None => n_other += 1,
        }
    }

    for (layer, files) in job.layers.iter().zip(layer_files.iter()) {
        log::info!("{layer}: {} files", files.len());
    }
    if n_other > 0 {
        log::info!("{n_other} files of other layers ignored");
    }

    let mut layers = vec![];
    for (layer, files) in job.layers.iter().zip(layer_files) {
        if files.is_empty() {
            log::warn!("No files for layer {layer}");
            continue;
        }

        log::info!("Processing layer {layer}");
        let mut acc = CityAccumulator::new(cities);
        scan_rasters(&files, &mut acc, raster.sample_options, parse_doy_date_from_path, soil_moisture_percent);
        if acc.n_samples() == 0 {
            log::warn!("No valid values for layer {layer}, it will be left out");
            continue;
        }

        let locations = acc.finish(raster.timeseries_window, Product::SoilMoisture.precision())
            .into_iter()
            .map(|s| SoilMoistureLocation {
                place: Place::from(s.city),
                moisture: MoistureStats {
                    current_percent: s.aggregate.current,
                    average_percent: s.aggregate.average,
                    min_percent: s.aggregate.min,
                    max_percent: s.aggregate.max,
                },
                current_status: MoistureStatus::from(classify_soil_moisture(Some(s.aggregate.current))),
                timeseries: s.recent.iter()
                    .map(|x| {
                        let c = classify_soil_moisture(Some(x.value));
                        MoisturePoint {
                            date: x.date,
                            moisture_percent: x.value,
                            status: c.status.to_string(),
                            description: c.description.to_string(),
                            recommendation: c.recommendation.unwrap_or_default().to_string(),
                        }
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        log::info!("{} cities with data for {layer}", locations.len());
        layers.push((layer.clone(), SoilMoistureLayer {
            layer: layer.clone(),
            description: layer_description(layer).to_string(),
            unit: UNIT.to_string(),
            source: SOURCE.to_string(),
            locations,
        }));
    }

    if layers.is_empty() {
        return Err(DatasetError::NoValidSamples.into());
    }

    Ok(SoilMoistureDocument {
        source: SOURCE.to_string(),
        product: PRODUCT.to_string(),
        region: job.raster.region.clone(),
        last_update: generated,
        layers,
    })
}

#[cfg(test)]
mod tests {
    use crate::{config::RasterJob, datasets::test_utils::*, raster::SampleOptions};

    use super::*;

    #[test]
    fn test_layers() {
        let dir = temp_dir("smap");
        write_benin_raster(&dir, "SPL4SMGP.008_Geophysical_Data_sm_rootzone_doy2025001013000_aid0001.tif", 0.25);
        write_benin_raster(&dir, "SPL4SMGP.008_Geophysical_Data_sm_rootzone_doy2025002013000_aid0001.tif", 0.35);
        write_benin_raster(&dir, "SPL4SMGP.008_Geophysical_Data_sm_profile_doy2025001013000_aid0001.tif", 0.30);
        let job = SoilMoistureJob {
            raster: RasterJob {
                region: "Benin".to_string(),
                input_dir: dir.clone(),
                file_glob: "*.tif".to_string(),
                output_json: dir.join("smap.json"),
                output_csv: dir.join("smap.csv"),
                timeseries_window: 5,
                sample_options: SampleOptions::default(),
            },
            layers: vec!["sm_surface".to_string(), "sm_rootzone".to_string()],
        };
        let generated = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let table = CityTable::benin().subset(&["Lokossa", "Kandi"]).unwrap();

        let doc = convert_soil_moisture(&job, &table, generated).unwrap();
        let csv = std::fs::read_to_string(&job.raster.output_csv).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(doc.layers.len(), 1);
        let (name, layer) = &doc.layers[0];
        assert_eq!(name, "sm_rootzone");
        assert_eq!(layer.description, "Humidité du sol en zone racinaire (0-100cm)");
        let loc = &layer.locations[0];
        assert_eq!(loc.place.city, "Lokossa");
        assert_eq!(loc.moisture.current_percent, 35.0);
        assert_eq!(loc.moisture.average_percent, 30.0);
        assert_eq!(loc.current_status.status, "good");
        assert_eq!(loc.timeseries[0].status, "moderate");

        // header + 2 cities * 2 dates
        assert_eq!(csv.lines().count(), 5);
        assert!(csv.starts_with("Layer,Layer_Description,City,Country,"));
    }

    #[test]
    fn test_layer_description() {
        assert_eq!(layer_description("sm_surface"), "Humidité du sol en surface (0-5cm)");
        assert_eq!(layer_description("sm_profile"), "sm_profile");
    }
}
