//! One line per city summaries of the documents, for printing at the end of a run.
use itertools::Itertools;

use super::{DailySoilMoistureDocument, NdviDocument, PrecipitationDocument, SoilMoistureDocument, TemperatureDocument};

pub fn temperature_preview(doc: &TemperatureDocument) -> Vec<String> {
    doc.locations.iter()
        .map(|loc| {
            let t = &loc.temperature;
            format!(
                "{:<15} {:>6.2} °C (average {:.2} °C, range {:.2} to {:.2} °C, {} dates)",
                loc.place.city, t.current_c, t.average_c, t.min_c, t.max_c, loc.timeseries.len()
            )
        })
        .collect()
}

pub fn ndvi_preview(doc: &NdviDocument) -> Vec<String> {
    doc.locations.iter()
        .map(|loc| {
            let v = &loc.vegetation_health;
            format!("{:<15} NDVI {:.4} ({}, {})", loc.place.city, v.current_ndvi, v.status, v.health_description)
        })
        .collect()
}

pub fn soil_moisture_preview(doc: &SoilMoistureDocument) -> Vec<String> {
    let mut lines = vec![];
    for (name, layer) in doc.layers.iter() {
        lines.push(format!("{name} ({}):", layer.description));
        for loc in layer.locations.iter() {
            lines.push(format!(
                "  {:<15} {:>5.1} % ({})",
                loc.place.city, loc.moisture.current_percent, loc.current_status.status
            ));
        }
    }
    lines
}

pub fn soil_moisture_daily_preview(doc: &DailySoilMoistureDocument) -> Vec<String> {
    let mut lines = vec![];
    for (name, layer) in doc.layers.iter() {
        lines.push(format!("{name} ({}):", layer.description));
        for loc in layer.locations.iter() {
            lines.push(format!(
                "  {:<15} {:>5.1} % ({}) at {}, {} days",
                loc.city, loc.current.percentage, loc.current.status, loc.current.timestamp, loc.timeseries.len()
            ));
        }
    }
    lines
}

pub fn precipitation_preview(doc: &PrecipitationDocument) -> Vec<String> {
    doc.locations.iter()
        .map(|loc| {
            let p = &loc.precipitation;
            format!(
                "{:<15} {:>7.2} mm total, {:.2} mm/day, max {:.2} mm, {} rainy days",
                loc.place.city, p.total_mm, p.average_daily_mm, p.max_daily_mm, p.rainy_days
            )
        })
        .collect()
}

/// How many of the `n_cities` requested made it into a document, as "2 of 3 cities". Layered
/// documents give one count per named layer, as "surface 2, rootzone 3 of 3 cities".
pub fn coverage_summary(counts: &[(&str, usize)], n_cities: usize) -> String {
    let per_layer = counts.iter()
        .map(|(name, n)| if name.is_empty() { n.to_string() } else { format!("{name} {n}") })
        .join(", ");
    format!("{per_layer} of {n_cities} cities")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::output::{DateRange, Place, PrecipitationLocation, PrecipitationStats};

    use super::*;

    #[test]
    fn test_precipitation_preview() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let doc = PrecipitationDocument {
            source: "NASA POWER API".to_string(),
            product: "Precipitation".to_string(),
            region: "Benin".to_string(),
            date_range: DateRange { start: d, end: d },
            last_update: d,
            locations: vec![PrecipitationLocation {
                place: Place { city: "Cotonou".to_string(), country: "Benin".to_string(), latitude: 6.3667, longitude: 2.3833 },
                precipitation: PrecipitationStats { total_mm: 12.5, average_daily_mm: 0.4, max_daily_mm: 8.0, rainy_days: 3 },
                timeseries: vec![],
            }],
        };

        let lines = precipitation_preview(&doc);
        assert_eq!(lines, ["Cotonou           12.50 mm total, 0.40 mm/day, max 8.00 mm, 3 rainy days"]);
    }

    #[test]
    fn test_coverage_summary() {
        assert_eq!(coverage_summary(&[("", 2)], 3), "2 of 3 cities");
        assert_eq!(coverage_summary(&[("surface", 2), ("rootzone", 3)], 3), "surface 2, rootzone 3 of 3 cities");
    }
}
