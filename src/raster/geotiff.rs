use std::{io::BufReader, path::{Path, PathBuf}};

use tiff::{decoder::{Decoder, DecodingResult}, tags::Tag};

use super::{projection::MODIS_SPHERE_RADIUS, Crs, GeoTransform, ProjectionError, RasterError, RasterSource};

// GeoKey IDs from the GeoTIFF 1.1 specification
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GT_CITATION: u16 = 1026;
const GEOGRAPHIC_TYPE: u16 = 2048;
const GEOG_SEMI_MAJOR_AXIS: u16 = 2057;
const GEOG_SEMI_MINOR_AXIS: u16 = 2058;
const GEOG_INV_FLATTENING: u16 = 2059;
const PROJECTED_CS_TYPE: u16 = 3072;
const PCS_CITATION: u16 = 3073;
const PROJ_COORD_TRANS: u16 = 3075;
const PROJ_STD_PARALLEL1: u16 = 3078;
const PROJ_STD_PARALLEL2: u16 = 3079;
const PROJ_NAT_ORIGIN_LONG: u16 = 3080;
const PROJ_NAT_ORIGIN_LAT: u16 = 3081;
const PROJ_FALSE_EASTING: u16 = 3082;
const PROJ_FALSE_NORTHING: u16 = 3083;
const PROJ_FALSE_ORIGIN_LONG: u16 = 3084;
const PROJ_FALSE_ORIGIN_LAT: u16 = 3085;
const PROJ_CENTER_LONG: u16 = 3088;
const PROJ_CENTER_LAT: u16 = 3089;
const PROJ_SCALE_AT_NAT_ORIGIN: u16 = 3092;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

// Coordinate transformation codes
const CT_TRANSVERSE_MERCATOR: u16 = 1;
const CT_MERCATOR: u16 = 7;
const CT_LAMBERT_CONF_CONIC_2SP: u16 = 8;
const CT_LAMBERT_AZIM_EQUAL_AREA: u16 = 10;
const CT_ALBERS_EQUAL_AREA: u16 = 11;
const CT_SINUSOIDAL: u16 = 24;
const CT_CYLINDRICAL_EQUAL_AREA: u16 = 28;

const GEO_DOUBLE_PARAMS_LOCATION: u16 = 34736;
const GEO_ASCII_PARAMS_LOCATION: u16 = 34737;

#[derive(Debug, thiserror::Error)]
pub enum GeoTiffError {
    #[error("Could not open {}: {1}", .0.display())]
    CannotOpen(PathBuf, std::io::Error),
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("{} has no georeferencing tags", .0.display())]
    MissingGeoreference(PathBuf),
    #[error("{} has a malformed GeoKey directory: {1}", .0.display())]
    BadGeoKeys(PathBuf, String),
    #[error("{} holds {n_values} values, which is not a whole number of {width}x{height} bands", .path.display())]
    SizeMismatch { path: PathBuf, n_values: usize, width: usize, height: usize },
    #[error("{} uses a sample format that cannot be read", .0.display())]
    UnsupportedSampleFormat(PathBuf),
}

/// Band 1 of a GeoTIFF file, read fully into memory.
#[derive(Debug, Clone)]
pub struct GeoTiffRaster {
    path: PathBuf,
    width: usize,
    height: usize,
    crs: Crs,
    transform: GeoTransform,
    nodata: Option<f64>,
    band1: Vec<f64>,
}

impl GeoTiffRaster {
    pub fn open(path: &Path) -> Result<Self, GeoTiffError> {
        let f = std::fs::File::open(path)
            .map_err(|e| GeoTiffError::CannotOpen(path.to_path_buf(), e))?;
        let mut decoder = Decoder::new(BufReader::new(f))?;

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        let geokeys = GeoKeys::read(&mut decoder, path)?;
        let crs = geokeys.as_ref()
            .map(|k| k.crs())
            .unwrap_or_else(|| Crs::unsupported("no GeoKey directory"));
        let pixel_is_point = geokeys.as_ref()
            .and_then(|k| k.short(GT_RASTER_TYPE))
            .is_some_and(|t| t == RASTER_PIXEL_IS_POINT);
        let transform = read_transform(&mut decoder, path, pixel_is_point)?;
        let nodata = read_nodata(&mut decoder)?;

        let planar_separate = decoder.find_tag(Tag::PlanarConfiguration)?
            .map(|v| v.into_u16())
            .transpose()?
            .is_some_and(|p| p == 2);
        let values = decoding_result_to_f64(decoder.read_image()?)
            .ok_or_else(|| GeoTiffError::UnsupportedSampleFormat(path.to_path_buf()))?;
        let band1 = extract_band1(values, width, height, planar_separate)
            .map_err(|n_values| GeoTiffError::SizeMismatch { path: path.to_path_buf(), n_values, width, height })?;

        log::debug!("Opened {} ({width}x{height}, {crs:?}, nodata = {nodata:?})", path.display());
        Ok(Self { path: path.to_path_buf(), width, height, crs, transform, nodata, band1 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for GeoTiffRaster {
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
        let err = || RasterError::PixelOutOfRange { row, col, height: self.height, width: self.width };
        if row >= self.height || col >= self.width {
            return Err(err());
        }
        self.band1.get(row * self.width + col).copied().ok_or_else(err)
    }
}

/// The parsed GeoKey directory plus its double and ASCII parameter tags.
struct GeoKeys {
    entries: Vec<[u16; 4]>,
    doubles: Vec<f64>,
    ascii: String,
}

impl GeoKeys {
    fn read<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Option<Self>, GeoTiffError> {
        let directory = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
            Some(v) => v.into_u16_vec()?,
            None => return Ok(None),
        };

        if directory.len() < 4 {
            return Err(GeoTiffError::BadGeoKeys(path.to_path_buf(), "header is shorter than 4 values".to_string()));
        }
        let n_keys = directory[3] as usize;
        if directory.len() < 4 * (n_keys + 1) {
            return Err(GeoTiffError::BadGeoKeys(
                path.to_path_buf(),
                format!("header declares {n_keys} keys but only {} values follow", directory.len() - 4)
            ));
        }

        let entries = directory[4..4 * (n_keys + 1)]
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        let doubles = decoder.find_tag(Tag::GeoDoubleParamsTag)?
            .map(|v| v.into_f64_vec())
            .transpose()?
            .unwrap_or_default();
        let ascii = decoder.find_tag(Tag::GeoAsciiParamsTag)?
            .map(|v| v.into_string())
            .transpose()?
            .unwrap_or_default();

        Ok(Some(Self { entries, doubles, ascii }))
    }

    fn entry(&self, key: u16) -> Option<&[u16; 4]> {
        self.entries.iter().find(|e| e[0] == key)
    }

    fn short(&self, key: u16) -> Option<u16> {
        self.entry(key).and_then(|e| if e[1] == 0 { Some(e[3]) } else { None })
    }

    fn double(&self, key: u16) -> Option<f64> {
        self.entry(key).and_then(|e| {
            if e[1] == GEO_DOUBLE_PARAMS_LOCATION {
                self.doubles.get(e[3] as usize).copied()
            } else {
                None
            }
        })
    }

    fn ascii(&self, key: u16) -> Option<&str> {
        self.entry(key).and_then(|e| {
            if e[1] == GEO_ASCII_PARAMS_LOCATION {
                let start = e[3] as usize;
                let end = start + e[2] as usize;
                self.ascii.get(start..end).map(|s| s.trim_end_matches(['|', '\0']))
            } else {
                None
            }
        })
    }

    fn crs(&self) -> Crs {
        let model_type = self.short(GT_MODEL_TYPE);
        let projected_cs = self.short(PROJECTED_CS_TYPE);

        if model_type == Some(MODEL_TYPE_GEOGRAPHIC) || (model_type.is_none() && projected_cs.is_none() && self.short(GEOGRAPHIC_TYPE).is_some()) {
            return Crs::geographic();
        }

        if model_type.is_some() && model_type != Some(MODEL_TYPE_PROJECTED) {
            return Crs::unsupported(format!("GeoTIFF model type {}", model_type.unwrap_or_default()));
        }

        let crs = match projected_cs {
            Some(USER_DEFINED) | None => self.user_defined_proj_string().and_then(|s| Crs::from_proj_string(&s)),
            Some(code) => Crs::from_epsg(code),
        };
        crs.unwrap_or_else(|e| Crs::unsupported(e.to_string()))
    }

    /// Assemble a proj string from the projection parameter keys of a user-defined CRS.
    fn user_defined_proj_string(&self) -> Result<String, ProjectionError> {
        let ct = match self.short(PROJ_COORD_TRANS) {
            Some(ct) => ct,
            None => {
                let citation = self.ascii(PCS_CITATION)
                    .or_else(|| self.ascii(GT_CITATION))
                    .unwrap_or("unknown projection");
                return Err(ProjectionError::Unsupported(citation.to_string()));
            }
        };

        let d = |key: u16| self.double(key).unwrap_or(0.0);
        let lon_0 = self.double(PROJ_NAT_ORIGIN_LONG).or_else(|| self.double(PROJ_CENTER_LONG)).unwrap_or(0.0);
        let lat_0 = self.double(PROJ_NAT_ORIGIN_LAT).or_else(|| self.double(PROJ_CENTER_LAT)).unwrap_or(0.0);
        let offsets = format!("+x_0={} +y_0={}", d(PROJ_FALSE_EASTING), d(PROJ_FALSE_NORTHING));

        let projection = match ct {
            CT_TRANSVERSE_MERCATOR => format!(
                "+proj=tmerc +lat_0={lat_0} +lon_0={lon_0} +k={} {offsets}",
                self.double(PROJ_SCALE_AT_NAT_ORIGIN).unwrap_or(1.0)
            ),
            CT_MERCATOR => format!(
                "+proj=merc +lon_0={lon_0} +k={} {offsets}",
                self.double(PROJ_SCALE_AT_NAT_ORIGIN).unwrap_or(1.0)
            ),
            CT_LAMBERT_CONF_CONIC_2SP => format!(
                "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} {offsets}",
                d(PROJ_STD_PARALLEL1), d(PROJ_STD_PARALLEL2),
                self.double(PROJ_FALSE_ORIGIN_LAT).unwrap_or(lat_0),
                self.double(PROJ_FALSE_ORIGIN_LONG).unwrap_or(lon_0),
            ),
            CT_LAMBERT_AZIM_EQUAL_AREA => format!("+proj=laea +lat_0={lat_0} +lon_0={lon_0} {offsets}"),
            CT_ALBERS_EQUAL_AREA => format!(
                "+proj=aea +lat_1={} +lat_2={} +lat_0={lat_0} +lon_0={lon_0} {offsets}",
                d(PROJ_STD_PARALLEL1), d(PROJ_STD_PARALLEL2)
            ),
            CT_SINUSOIDAL => format!("+proj=sinu +lon_0={lon_0} {offsets}"),
            CT_CYLINDRICAL_EQUAL_AREA => format!("+proj=cea +lat_ts={} +lon_0={lon_0} {offsets}", d(PROJ_STD_PARALLEL1)),
            ct => return Err(ProjectionError::Unsupported(format!("coordinate transformation code {ct}"))),
        };

        Ok(format!("{projection} {} +units=m +no_defs", self.ellipsoid(ct)))
    }

    fn ellipsoid(&self, ct: u16) -> String {
        match (self.double(GEOG_SEMI_MAJOR_AXIS), self.double(GEOG_SEMI_MINOR_AXIS), self.double(GEOG_INV_FLATTENING)) {
            (Some(a), Some(b), _) => format!("+a={a} +b={b}"),
            (Some(a), None, Some(rf)) if rf > 0.0 => format!("+a={a} +rf={rf}"),
            (Some(a), _, _) => format!("+a={a} +b={a}"),
            // MODIS files may leave out the sphere their sinusoidal grid is defined on
            (None, _, _) if ct == CT_SINUSOIDAL => format!("+a={MODIS_SPHERE_RADIUS} +b={MODIS_SPHERE_RADIUS}"),
            (None, _, _) => "+ellps=WGS84".to_string(),
        }
    }
}

fn read_transform<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>, path: &Path, pixel_is_point: bool) -> Result<GeoTransform, GeoTiffError> {
    let transformation = decoder.find_tag(Tag::ModelTransformationTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let tiepoints = decoder.find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    let mut gt = match (transformation, tiepoints, scale) {
        (Some(m), _, _) if m.len() >= 8 => GeoTransform([m[3], m[0], m[1], m[7], m[4], m[5]]),
        (_, Some(tp), Some(s)) if tp.len() >= 6 && s.len() >= 2 => {
            let (i, j, x, y) = (tp[0], tp[1], tp[3], tp[4]);
            GeoTransform([x - i * s[0], s[0], 0.0, y + j * s[1], 0.0, -s[1]])
        },
        _ => return Err(GeoTiffError::MissingGeoreference(path.to_path_buf())),
    };

    if pixel_is_point {
        // Coordinates refer to pixel centers, shift to the corner convention
        let c = gt.0;
        gt.0[0] = c[0] - 0.5 * c[1] - 0.5 * c[2];
        gt.0[3] = c[3] - 0.5 * c[4] - 0.5 * c[5];
    }
    Ok(gt)
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, GeoTiffError> {
    let text = match decoder.find_tag(Tag::GdalNodata)? {
        Some(v) => v.into_string()?,
        None => return Ok(None),
    };
    Ok(parse_nodata(&text))
}

fn parse_nodata(text: &str) -> Option<f64> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        s => s.parse().ok(),
    }
}

fn decoding_result_to_f64(result: DecodingResult) -> Option<Vec<f64>> {
    let values = match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(values)
}

/// Keep only the first sample of each pixel. On error, returns the number of values read.
fn extract_band1(values: Vec<f64>, width: usize, height: usize, planar_separate: bool) -> Result<Vec<f64>, usize> {
    let n_pixels = width * height;
    if n_pixels == 0 || values.len() < n_pixels || values.len() % n_pixels != 0 {
        return Err(values.len());
    }

    let samples_per_pixel = values.len() / n_pixels;
    if samples_per_pixel == 1 {
        Ok(values)
    } else if planar_separate {
        let mut values = values;
        values.truncate(n_pixels);
        Ok(values)
    } else {
        Ok(values.into_iter().step_by(samples_per_pixel).collect())
    }
}

/// Write a single band, north-up GeoTIFF in geographic coordinates.
#[cfg(test)]
pub(crate) fn write_test_geotiff(path: &Path, width: u32, height: u32, data: &[f32], origin: (f64, f64), pixel_size: f64, nodata: Option<&str>) {
    let geokeys = [1u16, 1, 0, 3, GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC, GT_RASTER_TYPE, 0, 1, 1, GEOGRAPHIC_TYPE, 0, 1, 4326];
    write_tagged_geotiff(path, (width, height), data, origin, pixel_size, nodata, &geokeys);
}

/// Write a single band, north-up GeoTIFF in the projected CRS with EPSG code `epsg`.
#[cfg(test)]
pub(crate) fn write_test_geotiff_projected(path: &Path, width: u32, height: u32, data: &[f32], origin: (f64, f64), pixel_size: f64, epsg: u16) {
    let geokeys = [1u16, 1, 0, 3, GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED, GT_RASTER_TYPE, 0, 1, 1, PROJECTED_CS_TYPE, 0, 1, epsg];
    write_tagged_geotiff(path, (width, height), data, origin, pixel_size, None, &geokeys);
}

#[cfg(test)]
fn write_tagged_geotiff(path: &Path, (width, height): (u32, u32), data: &[f32], origin: (f64, f64), pixel_size: f64, nodata: Option<&str>, geokeys: &[u16]) {
    use tiff::encoder::{colortype, TiffEncoder};

    let f = std::fs::File::create(path).unwrap();
    let mut tiff = TiffEncoder::new(f).unwrap();
    let mut image = tiff.new_image::<colortype::Gray32Float>(width, height).unwrap();
    let encoder = image.encoder();
    encoder.write_tag(Tag::ModelPixelScaleTag, &[pixel_size, pixel_size, 0.0][..]).unwrap();
    encoder.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, origin.0, origin.1, 0.0][..]).unwrap();
    encoder.write_tag(Tag::GeoKeyDirectoryTag, geokeys).unwrap();
    if let Some(nd) = nodata {
        encoder.write_tag(Tag::GdalNodata, nd).unwrap();
    }
    image.write_data(data).unwrap();
}
