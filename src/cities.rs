use std::{path::{Path, PathBuf}, ffi::OsStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CityTableError {
    #[error("Cannot read city file {0}: {1}")]
    CannotReadFile(PathBuf, std::io::Error),
    #[error("Error deserializing {0}: {1}")]
    JsonDeserializationError(PathBuf, serde_json::Error),
    #[error("Error deserializing {0}: {1}")]
    TomlDeserializationError(PathBuf, toml::de::Error),
    #[error("Received a city file with an unimplemented file extension: {0}")]
    UnknownExtension(PathBuf),
    #[error("Received a city file with invalid UTF-8 in its extension: {0}")]
    InvalidExtension(PathBuf),
    #[error("City '{0}' is listed more than once")]
    DuplicateCity(String),
    #[error("City '{0}' is not in the city table")]
    UnknownCity(String),
    #[error("City '{name}' has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { name: String, latitude: f64, longitude: f64 },
    #[error("The city table is empty")]
    Empty,
}

/// A fixed location for which values are extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub country: String,
    /// Latitude in degrees, south is negative
    pub latitude: f64,
    /// Longitude in degrees, west is negative
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
}

impl City {
    fn new(name: &str, latitude: f64, longitude: f64, region: &str, soil_type: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            country: "Benin".to_string(),
            latitude,
            longitude,
            region: Some(region.to_string()),
            soil_type: soil_type.map(|s| s.to_string()),
        }
    }

    /// Euclidean distance to (`latitude`, `longitude`), in degrees.
    pub fn distance_deg(&self, latitude: f64, longitude: f64) -> f64 {
        let dlat = self.latitude - latitude;
        let dlon = self.longitude - longitude;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

/// The set of cities every converter extracts values for, in output order.
///
/// City names are unique, so a table can be queried or subset by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTable {
    #[serde(rename = "city")]
    cities: Vec<City>,
}

impl Default for CityTable {
    fn default() -> Self {
        Self::benin()
    }
}

impl CityTable {
    pub fn new(cities: Vec<City>) -> Result<Self, CityTableError> {
        if cities.is_empty() {
            return Err(CityTableError::Empty);
        }

        for (i, city) in cities.iter().enumerate() {
            if cities[..i].iter().any(|c| c.name == city.name) {
                return Err(CityTableError::DuplicateCity(city.name.clone()));
            }
            let lat_ok = (-90.0..=90.0).contains(&city.latitude);
            let lon_ok = (-180.0..=180.0).contains(&city.longitude);
            if !lat_ok || !lon_ok {
                return Err(CityTableError::InvalidCoordinates {
                    name: city.name.clone(),
                    latitude: city.latitude,
                    longitude: city.longitude
                });
            }
        }
        Ok(Self { cities })
    }

    /// The built-in table of Beninese cities.
    pub fn benin() -> Self {
        let cities = vec![
            City::new("Cotonou", 6.3667, 2.3833, "Littoral", Some("sandy")),
            City::new("Porto-Novo", 6.4969, 2.6289, "Ouémé", Some("clay")),
            City::new("Parakou", 9.3372, 2.6103, "Borgou", Some("ferruginous_tropical")),
            City::new("Djougou", 9.7084, 1.6660, "Donga", Some("ferruginous")),
            City::new("Bohicon", 7.1782, 2.0667, "Zou", Some("ferrallitic")),
            City::new("Natitingou", 10.3045, 1.3797, "Atakora", Some("lateritic")),
            City::new("Abomey-Calavi", 6.4489, 2.3553, "Atlantique", None),
            City::new("Kandi", 11.1342, 2.9386, "Alibori", Some("sandy_loam")),
            City::new("Abomey", 7.1833, 1.9833, "Zou", Some("ferrallitic")),
            City::new("Ouidah", 6.3628, 2.0852, "Atlantique", Some("sandy_coastal")),
            City::new("Lokossa", 6.6389, 1.7167, "Mono", Some("hydromorphic")),
            City::new("Malanville", 11.8667, 3.3833, "Alibori", Some("alluvial")),
        ];
        Self { cities }
    }

    /// Load a city table from a file. The format is chosen from the extension.
    ///
    /// Supported file formats:
    /// - `.json`, either a list of cities or `{"city": [...]}`
    /// - `.toml`, as a `[[city]]` array of tables
    pub fn load_file(city_file: &Path) -> Result<Self, CityTableError> {
        let cities = match CityFileType::try_from(city_file)? {
            CityFileType::Json => Self::load_json(city_file)?,
            CityFileType::Toml => Self::load_toml(city_file)?,
        };
        Self::new(cities)
    }

    fn load_json(city_json_file: &Path) -> Result<Vec<City>, CityTableError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum JsonCities {
            List(Vec<City>),
            Table { city: Vec<City> },
        }

        let reader = std::fs::File::open(city_json_file)
            .map_err(|e| CityTableError::CannotReadFile(city_json_file.to_path_buf(), e))?;
        let cities: JsonCities = serde_json::from_reader(reader)
            .map_err(|e| CityTableError::JsonDeserializationError(city_json_file.to_path_buf(), e))?;
        match cities {
            JsonCities::List(c) => Ok(c),
            JsonCities::Table { city } => Ok(city),
        }
    }

    fn load_toml(city_toml_file: &Path) -> Result<Vec<City>, CityTableError> {
        let contents = std::fs::read_to_string(city_toml_file)
            .map_err(|e| CityTableError::CannotReadFile(city_toml_file.to_path_buf(), e))?;
        let table: CityTable = toml::from_str(&contents)
            .map_err(|e| CityTableError::TomlDeserializationError(city_toml_file.to_path_buf(), e))?;
        Ok(table.cities)
    }

    /// Keep only the named cities, in the order given.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, CityTableError> {
        let cities = names.iter()
            .map(|n| self.get(n.as_ref())
                .cloned()
                .ok_or_else(|| CityTableError::UnknownCity(n.as_ref().to_string()))
            ).collect::<Result<Vec<_>, _>>()?;
        Self::new(cities)
    }

    pub fn get(&self, name: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, City> {
        self.cities.iter()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Find the city closest to (`latitude`, `longitude`), comparing Euclidean distance
    /// in degrees. Returns `None` if the closest city is more than `max_distance_deg` away.
    /// On a tie the first city in table order wins.
    pub fn nearest(&self, latitude: f64, longitude: f64, max_distance_deg: f64) -> Option<&City> {
        let mut best: Option<(&City, f64)> = None;
        for city in self.cities.iter() {
            let dist = city.distance_deg(latitude, longitude);
            match best {
                Some((_, best_dist)) if dist >= best_dist => (),
                _ => best = Some((city, dist)),
            }
        }

        best.filter(|(_, d)| *d <= max_distance_deg)
            .map(|(c, _)| c)
    }
}

impl<'a> IntoIterator for &'a CityTable {
    type Item = &'a City;
    type IntoIter = std::slice::Iter<'a, City>;

    fn into_iter(self) -> Self::IntoIter {
        self.cities.iter()
    }
}


#[derive(Debug, Clone)]
enum CityFileType {
    Json,
    Toml,
}

impl TryFrom<&Path> for CityFileType {
    type Error = CityTableError;

    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        let extension = value.extension()
            .unwrap_or(OsStr::new(""))
            .to_str()
            .ok_or_else(|| CityTableError::InvalidExtension(value.to_path_buf()))?;

        match extension {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(CityTableError::UnknownExtension(value.to_path_buf()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_within_one_degree() {
        let table = CityTable::benin();
        let c = table.nearest(6.40, 2.40, 1.0).unwrap();
        assert_eq!(c.name, "Cotonou");

        let c = table.nearest(9.9, 2.5, 1.0).unwrap();
        assert_eq!(c.name, "Parakou");
    }

    #[test]
    fn test_nearest_too_far() {
        let table = CityTable::benin();
        // Lagos is about 1.1 degrees east of Porto-Novo
        assert!(table.nearest(6.5244, 3.7, 1.0).is_none());
        assert!(table.nearest(0.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let table = CityTable::new(vec![
            City::new("A", 0.0, 0.0, "r", None),
            City::new("B", 0.0, 1.0, "r", None),
        ]).unwrap();
        assert_eq!(table.nearest(0.0, 0.5, 1.0).unwrap().name, "A");
    }

    #[test]
    fn test_subset_and_duplicates() {
        let table = CityTable::benin();
        let sub = table.subset(&["Kandi", "Cotonou"]).unwrap();
        let names: Vec<_> = sub.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Kandi", "Cotonou"]);

        assert!(matches!(table.subset(&["Lagos"]), Err(CityTableError::UnknownCity(_))));
        assert!(matches!(table.subset(&["Kandi", "Kandi"]), Err(CityTableError::DuplicateCity(_))));
    }

    #[test]
    fn test_city_table_toml_round_trip() {
        let table = CityTable::benin();
        let s = toml::to_string_pretty(&table).unwrap();
        let table2: CityTable = toml::from_str(&s).unwrap();
        assert_eq!(table, table2);
    }

    #[test]
    fn test_load_json_list() {
        let path = std::env::temp_dir().join(format!("eo-city-rs-cities-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"name": "Cotonou", "country": "Benin", "latitude": 6.3667, "longitude": 2.3833}]"#
        ).unwrap();
        let table = CityTable::load_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Cotonou").unwrap().region, None);
    }

    #[test]
    fn test_unknown_extension() {
        let res = CityTable::load_file(Path::new("cities.yaml"));
        assert!(matches!(res, Err(CityTableError::UnknownExtension(_))));
    }
}
