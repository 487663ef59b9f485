//! Threshold classification of converted values.
//!
//! Each scheme is an ordered list of bands with an exclusive upper bound. Bands are
//! checked from low to high with `<`, so a value exactly on a boundary belongs to the
//! higher band. The last band has no upper bound.
use serde::Serialize;

/// The result of classifying one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub status: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<&'static str>,
}

struct Band {
    upper: Option<f64>,
    class: Classification,
}

const fn band(upper: Option<f64>, status: &'static str, description: &'static str, color: &'static str, recommendation: Option<&'static str>) -> Band {
    Band { upper, class: Classification { status, description, color, recommendation } }
}

/// A fixed set of bands plus the classification given to a missing value.
pub struct ClassScheme {
    bands: &'static [Band],
    unknown: Classification,
    range_labels: &'static [(&'static str, &'static str)],
}

impl ClassScheme {
    /// Classify `value`. `None` and NaN both give the "unknown" class.
    pub fn classify(&self, value: Option<f64>) -> Classification {
        let value = match value {
            Some(v) if !v.is_nan() => v,
            _ => return self.unknown.clone(),
        };

        for b in self.bands {
            match b.upper {
                Some(upper) if value < upper => return b.class.clone(),
                Some(_) => continue,
                None => return b.class.clone(),
            }
        }
        self.unknown.clone()
    }

    /// Human readable range -> meaning pairs for the document's interpretation block.
    pub fn range_labels(&self) -> &'static [(&'static str, &'static str)] {
        self.range_labels
    }
}

pub static NDVI_SCHEME: ClassScheme = ClassScheme {
    bands: &[
        band(Some(0.0), "water", "Eau", "blue", None),
        band(Some(0.2), "bare", "Sol nu / Très mauvaise", "brown", None),
        band(Some(0.4), "poor", "Végétation faible", "orange", None),
        band(Some(0.6), "moderate", "Bonne santé", "lightgreen", None),
        band(Some(0.8), "good", "Excellente santé", "green", None),
        band(None, "excellent", "Végétation très dense", "darkgreen", None),
    ],
    unknown: Classification { status: "unknown", description: "Données manquantes", color: "gray", recommendation: None },
    range_labels: &[
        ("< 0", "Eau"),
        ("0 - 0.2", "Sol nu / Végétation très faible"),
        ("0.2 - 0.4", "Végétation faible"),
        ("0.4 - 0.6", "Bonne santé"),
        ("0.6 - 0.8", "Excellente santé"),
        ("0.8 - 1.0", "Végétation très dense"),
    ],
};

/// Soil moisture in percent, used for the 3-hourly multi-layer product.
pub static SOIL_MOISTURE_SCHEME: ClassScheme = ClassScheme {
    bands: &[
        band(Some(10.0), "very_dry", "Sol très sec", "brown", Some("Irrigation urgente nécessaire")),
        band(Some(20.0), "dry", "Sol sec", "orange", Some("Irrigation recommandée")),
        band(Some(30.0), "moderate", "Humidité modérée", "yellow", Some("Surveiller, irrigation possible")),
        band(Some(40.0), "good", "Bonne humidité", "lightgreen", Some("Niveau optimal pour la plupart des cultures")),
        band(None, "saturated", "Sol saturé", "blue", Some("Risque d'excès d'eau, drainage nécessaire")),
    ],
    unknown: Classification {
        status: "unknown",
        description: "Données non disponibles",
        color: "gray",
        recommendation: Some("Vérifier manuellement"),
    },
    range_labels: &[
        ("< 10%", "Sol très sec"),
        ("10-20%", "Sol sec"),
        ("20-30%", "Humidité modérée"),
        ("30-40%", "Bonne humidité"),
        ("> 40%", "Sol saturé"),
    ],
};

/// Soil moisture in percent, used for the daily averaged root zone product.
pub static DAILY_SOIL_MOISTURE_SCHEME: ClassScheme = ClassScheme {
    bands: &[
        band(Some(15.0), "very_dry", "Sol très sec", "brown", Some("Irrigation urgente recommandée")),
        band(Some(20.0), "dry", "Sol sec", "orange", Some("Irrigation nécessaire")),
        band(Some(25.0), "moderate", "Humidité modérée", "yellow", Some("Irrigation modérée nécessaire")),
        band(Some(35.0), "optimal", "Humidité idéale pour cultures", "lightgreen", None),
        band(None, "saturated", "Sol saturé", "blue", Some("Risque excès d'eau, réduire irrigation")),
    ],
    unknown: Classification {
        status: "unknown",
        description: "Données non disponibles",
        color: "gray",
        recommendation: Some("Vérifier manuellement"),
    },
    range_labels: &[
        ("very_dry", "< 15% - Irrigation urgente recommandée"),
        ("dry", "15-20% - Sol sec, irrigation nécessaire"),
        ("moderate", "20-25% - Irrigation modérée nécessaire"),
        ("optimal", "25-35% - Humidité idéale pour cultures"),
        ("saturated", "> 35% - Risque excès d'eau, réduire irrigation"),
    ],
};

pub fn classify_ndvi(ndvi: Option<f64>) -> Classification {
    NDVI_SCHEME.classify(ndvi)
}

pub fn classify_soil_moisture(percent: Option<f64>) -> Classification {
    SOIL_MOISTURE_SCHEME.classify(percent)
}

pub fn classify_daily_soil_moisture(percent: Option<f64>) -> Classification {
    DAILY_SOIL_MOISTURE_SCHEME.classify(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndvi_bands() {
        assert_eq!(classify_ndvi(Some(-0.1)).status, "water");
        assert_eq!(classify_ndvi(Some(0.0)).status, "bare");
        assert_eq!(classify_ndvi(Some(0.39999)).status, "poor");
        assert_eq!(classify_ndvi(Some(0.4)).status, "moderate");
        assert_eq!(classify_ndvi(Some(0.79)).status, "good");
        assert_eq!(classify_ndvi(Some(0.95)).status, "excellent");
        assert_eq!(classify_ndvi(Some(0.95)).color, "darkgreen");
    }

    #[test]
    fn test_missing_is_unknown() {
        let c = classify_ndvi(None);
        assert_eq!(c.status, "unknown");
        assert_eq!(c.description, "Données manquantes");
        assert_eq!(classify_ndvi(Some(f64::NAN)).status, "unknown");

        let c = classify_soil_moisture(None);
        assert_eq!(c.color, "gray");
        assert_eq!(c.recommendation, Some("Vérifier manuellement"));
    }

    #[test]
    fn test_soil_moisture_bands() {
        assert_eq!(classify_soil_moisture(Some(9.99)).status, "very_dry");
        assert_eq!(classify_soil_moisture(Some(10.0)).status, "dry");
        assert_eq!(classify_soil_moisture(Some(29.0)).status, "moderate");
        assert_eq!(classify_soil_moisture(Some(30.0)).status, "good");
        assert_eq!(classify_soil_moisture(Some(40.0)).status, "saturated");
    }

    #[test]
    fn test_daily_soil_moisture_bands() {
        assert_eq!(classify_daily_soil_moisture(Some(14.9)).status, "very_dry");
        assert_eq!(classify_daily_soil_moisture(Some(20.0)).status, "moderate");
        assert_eq!(classify_daily_soil_moisture(Some(25.0)).status, "optimal");
        assert_eq!(classify_daily_soil_moisture(Some(35.0)).status, "saturated");
    }
}
