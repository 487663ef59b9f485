//! The JSON documents read by the web front end. Field names are part of the front end's
//! contract and must not change.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{cities::City, classify::Classification};

use super::ordered_map;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The static city fields repeated in every location entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&City> for Place {
    fn from(city: &City) -> Self {
        Self {
            city: city.name.clone(),
            country: city.country.clone(),
            latitude: city.latitude,
            longitude: city.longitude,
        }
    }
}

// ---------------- //
// Land temperature //
// ---------------- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureDocument {
    pub source: String,
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub region: String,
    #[serde(rename = "dateRange", default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(rename = "lastUpdate")]
    pub last_update: NaiveDate,
    pub locations: Vec<TemperatureLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureLocation {
    #[serde(flatten)]
    pub place: Place,
    pub temperature: TemperatureStats,
    pub timeseries: Vec<TemperaturePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub average_c: f64,
    pub min_c: f64,
    pub max_c: f64,
    pub current_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperaturePoint {
    pub date: NaiveDate,
    pub temperature_c: f64,
    /// The undecoded pixel value, only known when read from a raster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<i64>,
}

// ---- //
// NDVI //
// ---- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdviDocument {
    pub source: String,
    pub product: String,
    pub resolution: String,
    pub region: String,
    #[serde(rename = "lastUpdate")]
    pub last_update: NaiveDate,
    pub locations: Vec<NdviLocation>,
    pub interpretation: NdviInterpretation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdviInterpretation {
    #[serde(with = "ordered_map")]
    pub ranges: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdviLocation {
    #[serde(flatten)]
    pub place: Place,
    pub vegetation_health: VegetationHealth,
    pub timeseries: Vec<NdviPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationHealth {
    pub current_ndvi: f64,
    pub average_ndvi: f64,
    pub min_ndvi: f64,
    pub max_ndvi: f64,
    pub status: String,
    pub health_description: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdviPoint {
    pub date: NaiveDate,
    pub ndvi: f64,
    pub health: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<i64>,
}

// ------------------------------ //
// Soil moisture, multiple layers //
// ------------------------------ //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilMoistureDocument {
    pub source: String,
    pub product: String,
    pub region: String,
    #[serde(rename = "lastUpdate")]
    pub last_update: NaiveDate,
    #[serde(with = "ordered_map")]
    pub layers: Vec<(String, SoilMoistureLayer)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilMoistureLayer {
    pub layer: String,
    pub description: String,
    pub unit: String,
    pub source: String,
    pub locations: Vec<SoilMoistureLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilMoistureLocation {
    #[serde(flatten)]
    pub place: Place,
    pub moisture: MoistureStats,
    pub current_status: MoistureStatus,
    pub timeseries: Vec<MoisturePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureStats {
    pub current_percent: f64,
    pub average_percent: f64,
    pub min_percent: f64,
    pub max_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureStatus {
    pub status: String,
    pub description: String,
    pub recommendation: String,
    pub color: String,
}

impl From<Classification> for MoistureStatus {
    fn from(c: Classification) -> Self {
        Self {
            status: c.status.to_string(),
            description: c.description.to_string(),
            recommendation: c.recommendation.unwrap_or_default().to_string(),
            color: c.color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoisturePoint {
    pub date: NaiveDate,
    pub moisture_percent: f64,
    pub status: String,
    pub description: String,
    pub recommendation: String,
}

// ------------------------------ //
// Soil moisture, daily root zone //
// ------------------------------ //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySoilMoistureDocument {
    pub source: String,
    pub product: String,
    pub description: String,
    pub spatial_resolution: String,
    pub temporal_resolution: String,
    #[serde(with = "ordered_map")]
    pub units: Vec<(String, String)>,
    #[serde(rename = "lastUpdate")]
    pub last_update: NaiveDate,
    pub coverage: String,
    #[serde(with = "ordered_map")]
    pub layers: Vec<(String, DailyLayer)>,
    #[serde(with = "ordered_map")]
    pub interpretation: Vec<(String, String)>,
    pub data_access: DataAccess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLayer {
    pub description: String,
    pub unit: String,
    pub locations: Vec<DailyLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLocation {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub region: Option<String>,
    pub soil_type: Option<String>,
    pub current: DailyCurrent,
    pub statistics: DailyStatistics,
    pub timeseries: Vec<DailyPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCurrent {
    pub volumetric: f64,
    pub percentage: f64,
    pub status: String,
    /// Noon UTC of the latest day, as `YYYY-MM-DDT12:00:00Z`
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub average_percent: f64,
    pub min_percent: f64,
    pub max_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Volumetric fraction
    pub value: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccess {
    pub api: String,
    pub documentation: String,
    pub earthdata_login_required: bool,
}

// ------------- //
// Precipitation //
// ------------- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationDocument {
    pub source: String,
    pub product: String,
    pub region: String,
    #[serde(rename = "dateRange")]
    pub date_range: DateRange,
    #[serde(rename = "lastUpdate")]
    pub last_update: NaiveDate,
    pub locations: Vec<PrecipitationLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationLocation {
    #[serde(flatten)]
    pub place: Place,
    pub precipitation: PrecipitationStats,
    pub timeseries: Vec<PrecipitationPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationStats {
    pub total_mm: f64,
    pub average_daily_mm: f64,
    pub max_daily_mm: f64,
    pub rainy_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationPoint {
    pub date: NaiveDate,
    pub precipitation_mm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cities::CityTable;

    #[test]
    fn test_temperature_keys() {
        let table = CityTable::benin();
        let doc = TemperatureDocument {
            source: "NASA MODIS MOD11A2.061".to_string(),
            product: "Land Surface Temperature (8-Day)".to_string(),
            resolution: Some("1km".to_string()),
            region: "Benin".to_string(),
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
            }),
            last_update: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            locations: vec![TemperatureLocation {
                place: Place::from(table.get("Cotonou").unwrap()),
                temperature: TemperatureStats { average_c: 1.0, min_c: 0.5, max_c: 1.5, current_c: 1.5 },
                timeseries: vec![TemperaturePoint { date: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(), temperature_c: 1.5, raw_value: None }],
            }],
        };

        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["dateRange"]["start"], "2025-01-01");
        assert_eq!(v["lastUpdate"], "2025-02-01");
        assert_eq!(v["locations"][0]["city"], "Cotonou");
        assert_eq!(v["locations"][0]["country"], "Benin");
        assert_eq!(v["locations"][0]["temperature"]["current_c"], 1.5);
        assert!(v["locations"][0]["timeseries"][0].get("raw_value").is_none());
    }

    #[test]
    fn test_tabular_temperature_document_reads() {
        // Documents from the tabular converter have no resolution, date range or raw values
        let json = r#"{
            "source": "NASA MODIS MOD11A2.061",
            "product": "Land Surface Temperature (8-Day)",
            "region": "Benin",
            "lastUpdate": "2025-02-01",
            "locations": [{
                "city": "Parakou", "country": "Benin", "latitude": 9.3372, "longitude": 2.6103,
                "temperature": {"average_c": 30.0, "min_c": 29.0, "max_c": 31.0, "current_c": 31.0},
                "timeseries": [{"date": "2025-01-09", "temperature_c": 31.0}]
            }]
        }"#;
        let doc: TemperatureDocument = serde_json::from_str(json).unwrap();
        assert!(doc.resolution.is_none());
        assert!(doc.date_range.is_none());
        assert_eq!(doc.locations[0].place.city, "Parakou");
    }
}
