//! File discovery helpers shared by the converters.
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Input directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("Could not convert the file pattern '{}' into a valid UTF-8 string", .0.display())]
    NonUtf8Pattern(PathBuf),
    #[error("'{pattern}' is not a valid glob pattern: {source}")]
    BadPattern { pattern: String, source: glob::PatternError },
}

/// Find the files in `dir` matching `file_glob`, sorted by path.
///
/// Returns the files and the number of entries that could not be read while globbing;
/// those are skipped, so callers should warn if the count is not zero.
pub fn find_files(dir: &Path, file_glob: &str) -> Result<(Vec<PathBuf>, u64), DiscoveryError> {
    if !dir.is_dir() {
        return Err(DiscoveryError::MissingDirectory(dir.to_path_buf()));
    }

    let full_pattern = dir.join(file_glob);
    let full_pattern_str = full_pattern.to_str()
        .ok_or_else(|| DiscoveryError::NonUtf8Pattern(full_pattern.clone()))?;

    let glob_iter = glob::glob(full_pattern_str)
        .map_err(|e| DiscoveryError::BadPattern { pattern: full_pattern_str.to_string(), source: e })?;

    let mut files = vec![];
    let mut n_glob_err = 0;
    for entry in glob_iter {
        match entry {
            Ok(p) if p.is_file() => files.push(p),
            Ok(_) => (),
            Err(_) => n_glob_err += 1,
        }
    }

    files.sort();
    Ok((files, n_glob_err))
}

/// Browsers name a second download of the same file "name (1).ext".
pub fn is_duplicate_download(path: &Path) -> bool {
    file_name_lossy(path).contains("(1)")
}

/// Return the first of `layers` whose name appears in the file name (case insensitive).
pub fn identify_layer<'l, S: AsRef<str>>(path: &Path, layers: &'l [S]) -> Option<&'l str> {
    let name = file_name_lossy(path).to_lowercase();
    layers.iter()
        .map(|l| l.as_ref())
        .find(|l| name.contains(&l.to_lowercase()))
}

pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_files_sorted() {
        let dir = std::env::temp_dir().join(format!("eo-city-rs-find-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b_NDVI_doy2025017.tif", "a_NDVI_doy2025001.tif", "other.tif", "notes.txt"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        std::fs::create_dir_all(dir.join("sub_NDVI.tif")).unwrap();

        let (files, n_err) = find_files(&dir, "*NDVI*.tif").unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(n_err, 0);
        let names: Vec<String> = files.iter().map(|f| file_name_lossy(f)).collect();
        assert_eq!(names, ["a_NDVI_doy2025001.tif", "b_NDVI_doy2025017.tif"]);
    }

    #[test]
    fn test_find_files_missing_dir() {
        let res = find_files(Path::new("/definitely/not/a/real/dir"), "*.tif");
        assert!(matches!(res, Err(DiscoveryError::MissingDirectory(_))));
    }

    #[test]
    fn test_duplicate_download() {
        assert!(is_duplicate_download(Path::new("/x/SPL4SMGP_sm_rootzone_doy2025001 (1).tif")));
        assert!(!is_duplicate_download(Path::new("/x (1)/SPL4SMGP_sm_rootzone_doy2025001.tif")));
    }

    #[test]
    fn test_identify_layer() {
        let layers = ["sm_surface", "sm_rootzone"];
        let p = Path::new("SPL4SMGP.008_Geophysical_Data_SM_ROOTZONE_doy2025001.tif");
        assert_eq!(identify_layer(p, &layers), Some("sm_rootzone"));
        let p = Path::new("SPL4SMGP.008_Geophysical_Data_sm_profile_doy2025001.tif");
        assert_eq!(identify_layer(p, &layers), None);
    }
}
