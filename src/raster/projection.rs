//! Forward projection of WGS84 longitude/latitude into the coordinate reference system
//! of a raster. Projected systems go through [`proj4rs`], either from an EPSG code or
//! from a proj string assembled from a file's projection parameters.
use std::sync::Arc;

use proj4rs::Proj;

/// Radius of the sphere the MODIS sinusoidal grid is defined on, in meters
pub const MODIS_SPHERE_RADIUS: f64 = 6371007.181;

/// Source system for every transform. No datum is given, so proj4rs applies no datum
/// shift and latitudes are used as-is on the target ellipsoid or sphere.
const LONGLAT: &str = "+proj=longlat +ellps=WGS84 +no_defs";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("cannot build a projection from '{definition}': {reason}")]
    BadDefinition { definition: String, reason: String },
    #[error("could not project ({lon}, {lat}) into {crs}: {reason}")]
    Transform { lon: f64, lat: f64, crs: String, reason: String },
    #[error("unsupported coordinate reference system: {0}")]
    Unsupported(String),
}

/// A coordinate reference system a raster can be in.
#[derive(Clone)]
pub struct Crs {
    name: String,
    kind: CrsKind,
}

#[derive(Clone)]
enum CrsKind {
    /// Longitude/latitude in degrees, needing no transform
    Geographic,
    Projected { source: Arc<Proj>, target: Arc<Proj> },
    Unsupported(String),
}

impl Crs {
    /// Plain longitude/latitude in degrees (EPSG:4326 and other geographic systems).
    pub fn geographic() -> Self {
        Self { name: "EPSG:4326".to_string(), kind: CrsKind::Geographic }
    }

    /// A projected CRS from its EPSG code.
    pub fn from_epsg(code: u16) -> Result<Self, ProjectionError> {
        let name = format!("EPSG:{code}");
        let target = Proj::from_epsg_code(code)
            .map_err(|e| ProjectionError::BadDefinition { definition: name.clone(), reason: e.to_string() })?;
        Self::projected(name, target)
    }

    /// A projected CRS from a proj string such as `+proj=utm +zone=31 +datum=WGS84`.
    pub fn from_proj_string(definition: &str) -> Result<Self, ProjectionError> {
        let definition = definition.trim();
        let target = Proj::from_proj_string(definition)
            .map_err(|e| ProjectionError::BadDefinition { definition: definition.to_string(), reason: e.to_string() })?;
        Self::projected(definition.to_string(), target)
    }

    /// A CRS that cannot be projected into; every projection fails with `reason`.
    pub fn unsupported<S: Into<String>>(reason: S) -> Self {
        let reason = reason.into();
        Self { name: reason.clone(), kind: CrsKind::Unsupported(reason) }
    }

    fn projected(name: String, target: Proj) -> Result<Self, ProjectionError> {
        let source = Proj::from_proj_string(LONGLAT)
            .map_err(|e| ProjectionError::BadDefinition { definition: LONGLAT.to_string(), reason: e.to_string() })?;
        Ok(Self { name, kind: CrsKind::Projected { source: Arc::new(source), target: Arc::new(target) } })
    }

    /// The EPSG code or proj string this CRS was built from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic)
    }

    /// Project a WGS84 (`lon`, `lat`) pair in degrees to (x, y) in this CRS.
    pub fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ProjectionError::InvalidLatitude(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ProjectionError::InvalidLongitude(lon));
        }

        match &self.kind {
            CrsKind::Geographic => Ok((lon, lat)),
            CrsKind::Unsupported(reason) => Err(ProjectionError::Unsupported(reason.clone())),
            CrsKind::Projected { source, target } => {
                let err = |reason: String| ProjectionError::Transform { lon, lat, crs: self.name.clone(), reason };
                let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
                proj4rs::transform::transform(source, target, &mut point)
                    .map_err(|e| err(e.to_string()))?;
                if !point.0.is_finite() || !point.1.is_finite() {
                    return Err(err("result is not finite".to_string()));
                }
                Ok((point.0, point.1))
            },
        }
    }
}

impl std::fmt::Debug for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            CrsKind::Unsupported(_) => write!(f, "Crs(unsupported: {})", self.name),
            _ => write!(f, "Crs({})", self.name),
        }
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.is_geographic() == other.is_geographic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} != {b} within {tol}");
    }

    #[test]
    fn test_geographic_is_identity() {
        assert_eq!(Crs::geographic().project(2.3833, 6.3667).unwrap(), (2.3833, 6.3667));
    }

    #[test]
    fn test_utm_zone_31n() {
        let crs = Crs::from_epsg(32631).unwrap();
        assert_eq!(crs.name(), "EPSG:32631");
        assert!(!crs.is_geographic());

        // Cotonou is west of the 3E central meridian
        let (x, y) = crs.project(2.3833, 6.3667).unwrap();
        assert_close(x, 431795.9, 1.0);
        assert_close(y, 703781.4, 1.0);

        // On the central meridian x is the false easting
        let (x, _) = crs.project(3.0, 9.0).unwrap();
        assert_close(x, 500000.0, 0.01);
    }

    #[test]
    fn test_proj_string_matches_epsg() {
        let from_string = Crs::from_proj_string("+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs").unwrap();
        let (x, y) = from_string.project(2.3833, 6.3667).unwrap();
        assert_close(x, 431795.9, 1.0);
        assert_close(y, 703781.4, 1.0);
        assert_ne!(from_string, Crs::from_epsg(32631).unwrap());
    }

    #[test]
    fn test_bad_definition() {
        assert!(matches!(Crs::from_proj_string("+proj=nosuchprojection"), Err(ProjectionError::BadDefinition { .. })));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(Crs::geographic().project(0.0, 91.0), Err(ProjectionError::InvalidLatitude(_))));
        assert!(matches!(Crs::geographic().project(181.0, 0.0), Err(ProjectionError::InvalidLongitude(_))));
        assert!(matches!(Crs::unsupported("GeoTIFF model type 3").project(0.0, 0.0), Err(ProjectionError::Unsupported(_))));
    }
}
