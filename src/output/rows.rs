//! Flat CSV rows. Each time series point becomes one row that repeats its city's summary values.
use chrono::NaiveDate;
use serde::Serialize;

use super::documents::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureRow {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Temperature_C")]
    pub temperature_c: f64,
    #[serde(rename = "Raw_Value")]
    pub raw_value: Option<i64>,
    #[serde(rename = "Average_C")]
    pub average_c: f64,
    #[serde(rename = "Min_C")]
    pub min_c: f64,
    #[serde(rename = "Max_C")]
    pub max_c: f64,
    #[serde(rename = "Current_C")]
    pub current_c: f64,
}

pub fn temperature_rows(doc: &TemperatureDocument) -> Vec<TemperatureRow> {
    doc.locations.iter().flat_map(|loc| {
        let stats = &loc.temperature;
        loc.timeseries.iter().map(move |ts| TemperatureRow {
            city: loc.place.city.clone(),
            country: loc.place.country.clone(),
            latitude: loc.place.latitude,
            longitude: loc.place.longitude,
            date: ts.date,
            temperature_c: ts.temperature_c,
            raw_value: ts.raw_value,
            average_c: stats.average_c,
            min_c: stats.min_c,
            max_c: stats.max_c,
            current_c: stats.current_c,
        })
    }).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NdviRow {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "NDVI")]
    pub ndvi: f64,
    #[serde(rename = "Health_Status")]
    pub health_status: String,
    #[serde(rename = "Health_Description")]
    pub health_description: String,
    /// Color of the city's current status, not of this date
    #[serde(rename = "Color")]
    pub color: String,
    #[serde(rename = "Raw_Value")]
    pub raw_value: Option<i64>,
    #[serde(rename = "Average_NDVI")]
    pub average_ndvi: f64,
    #[serde(rename = "Min_NDVI")]
    pub min_ndvi: f64,
    #[serde(rename = "Max_NDVI")]
    pub max_ndvi: f64,
    #[serde(rename = "Current_NDVI")]
    pub current_ndvi: f64,
}

pub fn ndvi_rows(doc: &NdviDocument) -> Vec<NdviRow> {
    doc.locations.iter().flat_map(|loc| {
        let veg = &loc.vegetation_health;
        loc.timeseries.iter().map(move |ts| NdviRow {
            city: loc.place.city.clone(),
            country: loc.place.country.clone(),
            latitude: loc.place.latitude,
            longitude: loc.place.longitude,
            date: ts.date,
            ndvi: ts.ndvi,
            health_status: ts.status.clone(),
            health_description: ts.health.clone(),
            color: veg.color.clone(),
            raw_value: ts.raw_value,
            average_ndvi: veg.average_ndvi,
            min_ndvi: veg.min_ndvi,
            max_ndvi: veg.max_ndvi,
            current_ndvi: veg.current_ndvi,
        })
    }).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilMoistureRow {
    #[serde(rename = "Layer")]
    pub layer: String,
    #[serde(rename = "Layer_Description")]
    pub layer_description: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Moisture_Percent")]
    pub moisture_percent: f64,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Recommendation")]
    pub recommendation: String,
    #[serde(rename = "Current_Percent")]
    pub current_percent: f64,
    #[serde(rename = "Average_Percent")]
    pub average_percent: f64,
    #[serde(rename = "Min_Percent")]
    pub min_percent: f64,
    #[serde(rename = "Max_Percent")]
    pub max_percent: f64,
}

pub fn soil_moisture_rows(doc: &SoilMoistureDocument) -> Vec<SoilMoistureRow> {
    let mut rows = vec![];
    for (layer_name, layer) in doc.layers.iter() {
        for loc in layer.locations.iter() {
            let stats = &loc.moisture;
            for ts in loc.timeseries.iter() {
                rows.push(SoilMoistureRow {
                    layer: layer_name.clone(),
                    layer_description: layer.description.clone(),
                    city: loc.place.city.clone(),
                    country: loc.place.country.clone(),
                    latitude: loc.place.latitude,
                    longitude: loc.place.longitude,
                    date: ts.date,
                    moisture_percent: ts.moisture_percent,
                    status: ts.status.clone(),
                    description: ts.description.clone(),
                    recommendation: ts.recommendation.clone(),
                    current_percent: stats.current_percent,
                    average_percent: stats.average_percent,
                    min_percent: stats.min_percent,
                    max_percent: stats.max_percent,
                });
            }
        }
    }
    rows
}

/// One day of the daily soil moisture series. Column names are lower case, unlike the
/// other tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySoilMoistureRow {
    pub date: NaiveDate,
    pub city: String,
    pub region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub soil_type: Option<String>,
    pub soil_moisture_volumetric: f64,
    pub soil_moisture_percent: f64,
    pub status: String,
    pub current_percent: f64,
    pub average_percent: f64,
    pub min_percent: f64,
    pub max_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationRow {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Precipitation_mm")]
    pub precipitation_mm: f64,
    #[serde(rename = "Total_mm")]
    pub total_mm: f64,
    #[serde(rename = "Average_Daily_mm")]
    pub average_daily_mm: f64,
    #[serde(rename = "Max_Daily_mm")]
    pub max_daily_mm: f64,
    #[serde(rename = "Rainy_Days")]
    pub rainy_days: u32,
}

pub fn precipitation_rows(doc: &PrecipitationDocument) -> Vec<PrecipitationRow> {
    doc.locations.iter().flat_map(|loc| {
        let stats = &loc.precipitation;
        loc.timeseries.iter().map(move |ts| PrecipitationRow {
            city: loc.place.city.clone(),
            country: loc.place.country.clone(),
            latitude: loc.place.latitude,
            longitude: loc.place.longitude,
            date: ts.date,
            precipitation_mm: ts.precipitation_mm,
            total_mm: stats.total_mm,
            average_daily_mm: stats.average_daily_mm,
            max_daily_mm: stats.max_daily_mm,
            rainy_days: stats.rainy_days,
        })
    }).collect()
}

/// The current state of one city across the temperature and NDVI documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Temperature_Current_C")]
    pub temperature_current_c: f64,
    #[serde(rename = "Temperature_Avg_C")]
    pub temperature_avg_c: f64,
    #[serde(rename = "Temperature_Min_C")]
    pub temperature_min_c: f64,
    #[serde(rename = "Temperature_Max_C")]
    pub temperature_max_c: f64,
    #[serde(rename = "NDVI_Current")]
    pub ndvi_current: Option<f64>,
    #[serde(rename = "NDVI_Avg")]
    pub ndvi_avg: Option<f64>,
    #[serde(rename = "Health_Status")]
    pub health_status: Option<String>,
    #[serde(rename = "Health_Description")]
    pub health_description: Option<String>,
}

/// Join the two documents by city name. Every city of the temperature document gets a row,
/// in that document's order; NDVI columns are empty for cities missing from the NDVI document
/// and NDVI-only cities are left out.
pub fn summary_rows(temperature: &TemperatureDocument, ndvi: &NdviDocument) -> Vec<SummaryRow> {
    temperature.locations.iter().map(|t| {
        let veg = ndvi.locations.iter()
            .find(|n| n.place.city == t.place.city)
            .map(|n| &n.vegetation_health);
        SummaryRow {
            city: t.place.city.clone(),
            country: t.place.country.clone(),
            latitude: t.place.latitude,
            longitude: t.place.longitude,
            temperature_current_c: t.temperature.current_c,
            temperature_avg_c: t.temperature.average_c,
            temperature_min_c: t.temperature.min_c,
            temperature_max_c: t.temperature.max_c,
            ndvi_current: veg.map(|v| v.current_ndvi),
            ndvi_avg: veg.map(|v| v.average_ndvi),
            health_status: veg.map(|v| v.status.clone()),
            health_description: veg.map(|v| v.health_description.clone()),
        }
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn place(city: &str) -> Place {
        Place { city: city.to_string(), country: "Benin".to_string(), latitude: 6.0, longitude: 2.0 }
    }

    fn temperature_doc() -> TemperatureDocument {
        TemperatureDocument {
            source: "src".to_string(),
            product: "prod".to_string(),
            resolution: None,
            region: "Benin".to_string(),
            date_range: None,
            last_update: d(31),
            locations: vec![
                TemperatureLocation {
                    place: place("Cotonou"),
                    temperature: TemperatureStats { average_c: 30.5, min_c: 30.0, max_c: 31.0, current_c: 31.0 },
                    timeseries: vec![
                        TemperaturePoint { date: d(1), temperature_c: 30.0, raw_value: Some(16657) },
                        TemperaturePoint { date: d(9), temperature_c: 31.0, raw_value: Some(16707) },
                    ],
                },
                TemperatureLocation {
                    place: place("Kandi"),
                    temperature: TemperatureStats { average_c: 35.0, min_c: 35.0, max_c: 35.0, current_c: 35.0 },
                    timeseries: vec![TemperaturePoint { date: d(9), temperature_c: 35.0, raw_value: None }],
                },
            ],
        }
    }

    fn ndvi_doc() -> NdviDocument {
        NdviDocument {
            source: "src".to_string(),
            product: "prod".to_string(),
            resolution: "250m".to_string(),
            region: "Benin".to_string(),
            last_update: d(31),
            locations: vec![
                NdviLocation {
                    place: place("Cotonou"),
                    vegetation_health: VegetationHealth {
                        current_ndvi: 0.45,
                        average_ndvi: 0.4,
                        min_ndvi: 0.35,
                        max_ndvi: 0.45,
                        status: "moderate".to_string(),
                        health_description: "Bonne santé".to_string(),
                        color: "lightgreen".to_string(),
                    },
                    timeseries: vec![
                        NdviPoint { date: d(1), ndvi: 0.35, health: "Végétation faible".to_string(), status: "poor".to_string(), raw_value: Some(3500) },
                        NdviPoint { date: d(17), ndvi: 0.45, health: "Bonne santé".to_string(), status: "moderate".to_string(), raw_value: Some(4500) },
                    ],
                },
                NdviLocation {
                    place: place("Ouidah"),
                    vegetation_health: VegetationHealth {
                        current_ndvi: 0.7,
                        average_ndvi: 0.7,
                        min_ndvi: 0.7,
                        max_ndvi: 0.7,
                        status: "good".to_string(),
                        health_description: "Excellente santé".to_string(),
                        color: "green".to_string(),
                    },
                    timeseries: vec![],
                },
            ],
            interpretation: NdviInterpretation { ranges: vec![] },
        }
    }

    #[test]
    fn test_temperature_rows() {
        let rows = temperature_rows(&temperature_doc());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].city, "Cotonou");
        assert_eq!(rows[1].temperature_c, 31.0);
        assert_eq!(rows[1].average_c, 30.5);
        assert_eq!(rows[2].raw_value, None);
    }

    #[test]
    fn test_ndvi_rows_use_current_color() {
        let rows = ndvi_rows(&ndvi_doc());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].health_status, "poor");
        assert_eq!(rows[0].color, "lightgreen");
    }

    #[test]
    fn test_summary_join() {
        let rows = summary_rows(&temperature_doc(), &ndvi_doc());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "Cotonou");
        assert_eq!(rows[0].ndvi_current, Some(0.45));
        assert_eq!(rows[0].health_status.as_deref(), Some("moderate"));
        assert_eq!(rows[1].city, "Kandi");
        assert_eq!(rows[1].ndvi_current, None);
        assert_eq!(rows[1].health_description, None);
    }
}
