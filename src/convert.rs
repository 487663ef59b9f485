//! Scale/offset conversion from raw product values to physical units.
use crate::round_to;

/// MODIS LST scale factor, raw digital numbers are Kelvin / 0.02
pub const LST_SCALE: f64 = 0.02;
pub const KELVIN_OFFSET: f64 = 273.15;
/// MODIS vegetation index scale factor
pub const NDVI_SCALE: f64 = 0.0001;
/// Raw NDVI values at or below this are fill
pub const NDVI_FILL_THRESHOLD: f64 = -3000.0;
/// NASA POWER marks missing days with -999
pub const POWER_FILL: f64 = -999.0;

/// The products values are extracted from. Each knows how to turn a raw value into
/// its output unit and how many decimals to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// MODIS MOD11A2 land surface temperature, output in degrees Celsius
    LandSurfaceTemperature,
    /// MODIS MOD13 NDVI, output unitless in [-1, 1]
    Ndvi,
    /// SMAP L4 soil moisture, output in percent of volume
    SoilMoisture,
    /// NASA POWER PRECTOTCORR, output in mm/day
    Precipitation,
}

impl Product {
    /// Convert a raw value, returning `None` if it is fill or outside the physically valid range.
    pub fn convert(&self, raw: f64) -> Option<f64> {
        match self {
            Self::LandSurfaceTemperature => kelvin_to_celsius(raw),
            Self::Ndvi => scale_ndvi(raw),
            Self::SoilMoisture => soil_moisture_percent(raw),
            Self::Precipitation => precipitation_mm(raw),
        }
    }

    pub fn precision(&self) -> u32 {
        match self {
            Self::LandSurfaceTemperature => 2,
            Self::Ndvi => 4,
            Self::SoilMoisture => 2,
            Self::Precipitation => 2,
        }
    }
}

/// MODIS LST digital number to degrees Celsius, rounded to 2 decimals. Zero is the MODIS fill value.
pub fn kelvin_to_celsius(raw: f64) -> Option<f64> {
    if raw == 0.0 {
        return None;
    }
    lst_to_celsius(raw)
}

/// Like [`kelvin_to_celsius`], but converts a zero digital number instead of treating it as fill.
pub fn lst_to_celsius(raw: f64) -> Option<f64> {
    if !raw.is_finite() {
        return None;
    }
    let kelvin = raw * LST_SCALE;
    Some(round_to(kelvin - KELVIN_OFFSET, 2))
}

/// Scaled MODIS NDVI, rounded to 4 decimals.
pub fn scale_ndvi(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw <= NDVI_FILL_THRESHOLD {
        return None;
    }
    let ndvi = raw * NDVI_SCALE;
    if !(-1.0..=1.0).contains(&ndvi) {
        return None;
    }
    Some(round_to(ndvi, 4))
}

/// Check a volumetric soil moisture fraction, returning it rounded to 3 decimals.
pub fn soil_moisture_fraction(raw: f64) -> Option<f64> {
    if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
        return None;
    }
    Some(round_to(raw, 3))
}

/// Volumetric soil moisture fraction to percent, rounded to 2 decimals.
pub fn soil_moisture_percent(raw: f64) -> Option<f64> {
    if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
        return None;
    }
    Some(round_to(raw * 100.0, 2))
}

/// Daily precipitation in mm, rounded to 2 decimals. Negative values are POWER fill.
pub fn precipitation_mm(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    Some(round_to(raw, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lst() {
        assert_eq!(kelvin_to_celsius(13732.5), Some(round_to(13732.5 * 0.02 - 273.15, 2)));
        assert_eq!(kelvin_to_celsius(13732.5), Some(1.5));
        assert_eq!(kelvin_to_celsius(15000.0), Some(26.85));
        assert_eq!(kelvin_to_celsius(0.0), None);
        assert_eq!(kelvin_to_celsius(f64::NAN), None);
        assert_eq!(lst_to_celsius(0.0), Some(-273.15));
        assert_eq!(lst_to_celsius(15000.0), kelvin_to_celsius(15000.0));
        assert_eq!(lst_to_celsius(f64::INFINITY), None);
    }

    #[test]
    fn test_ndvi() {
        assert_eq!(scale_ndvi(5000.0), Some(0.5));
        assert_eq!(scale_ndvi(-3000.0), None);
        assert_eq!(scale_ndvi(-2999.0), Some(-0.2999));
        assert_eq!(scale_ndvi(10001.0), None);
        assert_eq!(scale_ndvi(9999.0), Some(0.9999));
    }

    #[test]
    fn test_soil_moisture() {
        assert_eq!(soil_moisture_percent(0.2534), Some(25.34));
        assert_eq!(soil_moisture_percent(1.2), None);
        assert_eq!(soil_moisture_percent(-0.01), None);
        assert_eq!(soil_moisture_fraction(0.25349), Some(0.253));
    }

    #[test]
    fn test_precipitation() {
        assert_eq!(precipitation_mm(POWER_FILL), None);
        assert_eq!(precipitation_mm(3.456), Some(3.46));
        assert_eq!(precipitation_mm(0.0), Some(0.0));
    }

    #[test]
    fn test_product_dispatch() {
        assert_eq!(Product::Ndvi.convert(5000.0), Some(0.5));
        assert_eq!(Product::LandSurfaceTemperature.convert(0.0), None);
        assert_eq!(Product::SoilMoisture.convert(0.3), Some(30.0));
        assert_eq!(Product::Ndvi.precision(), 4);
    }
}
