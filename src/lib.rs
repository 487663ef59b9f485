use std::path::{PathBuf, Path};

pub mod aggregate;
pub mod cities;
pub mod classify;
pub mod config;
pub mod convert;
pub mod datasets;
pub mod default_files;
pub mod doy;
pub mod output;
pub mod power;
pub mod raster;
pub mod utils;


/// If `p` is already an absolute path, return it unchanged. Otherwise, make it relative to
/// the parent directory of `config_file`.
///
/// # Panics
/// Panics if it cannot get the parent directory of `config_file`, which should only happen
/// if a root directory was given instead of a file, so this is considered an internal mistake.
pub(crate) fn path_relative_to_config(config_file: &Path, p: PathBuf) -> PathBuf {
    if p.is_absolute() {
        p
    } else if let Some(parent_dir) = config_file.parent() {
        parent_dir.join(p)
    } else {
        panic!("Could not get parent from path {}", config_file.display());
    }
}

/// Round `value` to `decimals` places after the decimal point.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
