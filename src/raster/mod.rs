//! Sampling single-band rasters at geographic points.
//!
//! A raster is anything implementing [`RasterSource`]; GeoTIFF files are read by
//! [`GeoTiffRaster`]. [`sample_point`] turns a longitude/latitude into a pixel value,
//! or into an explicit reason why no value is available.
use std::fmt::Display;

mod geotiff;
mod projection;

pub use geotiff::{GeoTiffRaster, GeoTiffError};
pub use projection::{Crs, ProjectionError};
#[cfg(test)]
pub(crate) use geotiff::write_test_geotiff;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("pixel (row {row}, column {col}) is outside the {height}x{width} raster")]
    PixelOutOfRange { row: usize, col: usize, height: usize, width: usize },
    #[error("the affine transform cannot be inverted (determinant is zero)")]
    SingularTransform,
}

/// A GDAL-style affine transform from (column, row) pixel indices to map (x, y) coordinates:
///
/// ```text
/// x = c[0] + col * c[1] + row * c[2]
/// y = c[3] + col * c[4] + row * c[5]
/// ```
///
/// Pixel indices refer to the upper left corner of a pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// A north-up transform with the upper left corner at (`x0`, `y0`) and square-ish
    /// pixels of `dx` by `dy` (`dy` is the positive pixel height).
    pub fn north_up(x0: f64, y0: f64, dx: f64, dy: f64) -> Self {
        Self([x0, dx, 0.0, y0, 0.0, -dy])
    }

    pub fn pixel_to_map(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.0;
        (c[0] + col * c[1] + row * c[2], c[3] + col * c[4] + row * c[5])
    }

    /// Invert the transform to get fractional (column, row) for a map coordinate.
    pub fn map_to_pixel(&self, x: f64, y: f64) -> Result<(f64, f64), RasterError> {
        let [x0, a, b, y0, d, e] = self.0;
        let det = a * e - b * d;
        if det == 0.0 || !det.is_finite() {
            return Err(RasterError::SingularTransform);
        }
        let dx = x - x0;
        let dy = y - y0;
        let col = (e * dx - b * dy) / det;
        let row = (-d * dx + a * dy) / det;
        Ok((col, row))
    }
}

/// A single-band raster with georeferencing.
pub trait RasterSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn crs(&self) -> &Crs;
    fn transform(&self) -> &GeoTransform;
    /// The declared no-data value, if any.
    fn nodata(&self) -> Option<f64>;
    /// Read the band 1 value at (`row`, `col`).
    fn read_pixel(&self, row: usize, col: usize) -> Result<f64, RasterError>;
}

/// Why a sampled pixel did not give a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDataReason {
    /// Equal to the raster's declared no-data value
    Sentinel,
    NotANumber,
    /// Exactly zero, which these products use as an undeclared fill value
    Zero,
}

impl Display for NoDataReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoDataReason::Sentinel => write!(f, "declared no-data value"),
            NoDataReason::NotANumber => write!(f, "NaN"),
            NoDataReason::Zero => write!(f, "zero fill value"),
        }
    }
}

/// The result of sampling a raster at one point.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Sampled(f64),
    OutOfBounds,
    NoData(NoDataReason),
    ReprojectionFailed(String),
    ReadFailed(String),
}

impl SampleOutcome {
    pub fn value(&self) -> Option<f64> {
        if let Self::Sampled(v) = self {
            Some(*v)
        } else {
            None
        }
    }
}

/// Options that change how [`sample_point`] filters pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    /// Treat a pixel value of exactly zero as no data.
    pub zero_is_nodata: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self { zero_is_nodata: true }
    }
}

/// Sample `raster` at the WGS84 point (`lon`, `lat`).
///
/// The point is projected into the raster CRS and the inverse affine transform gives the
/// pixel containing it. Pixels outside the raster are never read.
pub fn sample_point<R: RasterSource + ?Sized>(raster: &R, lon: f64, lat: f64, options: SampleOptions) -> SampleOutcome {
    let (x, y) = match raster.crs().project(lon, lat) {
        Ok(xy) => xy,
        Err(e) => return SampleOutcome::ReprojectionFailed(e.to_string()),
    };

    let (col, row) = match raster.transform().map_to_pixel(x, y) {
        Ok(cr) => cr,
        Err(e) => return SampleOutcome::ReprojectionFailed(e.to_string()),
    };

    let col = col.floor();
    let row = row.floor();
    if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
        return SampleOutcome::OutOfBounds;
    }

    let (col, row) = (col as usize, row as usize);
    if col >= raster.width() || row >= raster.height() {
        return SampleOutcome::OutOfBounds;
    }

    let value = match raster.read_pixel(row, col) {
        Ok(v) => v,
        Err(e) => return SampleOutcome::ReadFailed(e.to_string()),
    };

    if value.is_nan() {
        SampleOutcome::NoData(NoDataReason::NotANumber)
    } else if raster.nodata().is_some_and(|nd| nd == value) {
        SampleOutcome::NoData(NoDataReason::Sentinel)
    } else if options.zero_is_nodata && value == 0.0 {
        SampleOutcome::NoData(NoDataReason::Zero)
    } else {
        SampleOutcome::Sampled(value)
    }
}

/// A raster held in memory, stored row-major.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    pub width: usize,
    pub height: usize,
    pub crs: Crs,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    pub data: Vec<f64>,
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn crs(&self) -> &Crs {
        &self.crs
    }

    fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    fn read_pixel(&self, row: usize, col: usize) -> Result<f64, RasterError> {
        if row >= self.height || col >= self.width {
            return Err(RasterError::PixelOutOfRange { row, col, height: self.height, width: self.width });
        }
        self.data.get(row * self.width + col)
            .copied()
            .ok_or(RasterError::PixelOutOfRange { row, col, height: self.height, width: self.width })
    }
}
