//! Contents of the template files written by `eo-init`.
use std::path::Path;

use crate::{cities::CityTable, config::ConvertConfig};

/// A configuration file with every setting spelled out. If `cities_file` is given, the
/// configuration points to it instead of using the built-in city table.
pub fn default_config_toml(cities_file: Option<&Path>) -> String {
    let mut cfg = ConvertConfig::filled_defaults();
    cfg.cities_file = cities_file.map(|p| p.to_path_buf());
    toml::to_string_pretty(&cfg)
        .expect("failed to serialize the default configuration as TOML - this is a bug")
}

/// The built-in city table as a TOML `[[city]]` array.
pub fn default_cities_toml() -> String {
    toml::to_string_pretty(&CityTable::benin())
        .expect("failed to serialize the default city table as TOML - this is a bug")
}

/// The built-in city table as JSON.
pub fn default_cities_json() -> String {
    serde_json::to_string_pretty(&CityTable::benin())
        .expect("failed to serialize the default city table as JSON - this is a bug")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_written_files_load_back() {
        let dir = std::env::temp_dir().join(format!("eo-city-rs-defaults-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let cfg_file = dir.join("eo-config.toml");
        std::fs::write(&cfg_file, default_config_toml(Some(Path::new("cities.toml")))).unwrap();
        std::fs::write(dir.join("cities.toml"), default_cities_toml()).unwrap();
        std::fs::write(dir.join("cities.json"), default_cities_json()).unwrap();

        let cfg = ConvertConfig::read_from_path(&cfg_file).unwrap();
        let from_toml = cfg.city_table(None).unwrap();
        let from_json = CityTable::load_file(&dir.join("cities.json")).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(cfg.cities_file, Some(dir.join("cities.toml")));
        assert_eq!(from_toml, CityTable::benin());
        assert_eq!(from_json, CityTable::benin());
    }
}
