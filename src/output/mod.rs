//! The JSON documents and CSV tables the converters produce, and the functions that write them.
use std::{fs::File, io::{BufReader, BufWriter}, path::{Path, PathBuf}};

use serde::{de::DeserializeOwned, Serialize};

mod documents;
mod preview;
mod rows;

pub use documents::*;
pub use preview::*;
pub use rows::*;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Could not create directory {}: {1}", .0.display())]
    CreateDir(PathBuf, std::io::Error),
    #[error("Could not create {}: {1}", .0.display())]
    CreateFile(PathBuf, std::io::Error),
    #[error("Could not open {}: {1}", .0.display())]
    OpenFile(PathBuf, std::io::Error),
    #[error("Error writing JSON to {}: {1}", .0.display())]
    JsonWrite(PathBuf, serde_json::Error),
    #[error("Error reading JSON from {}: {1}", .0.display())]
    JsonRead(PathBuf, serde_json::Error),
    #[error("Error writing CSV to {}: {1}", .0.display())]
    CsvWrite(PathBuf, csv::Error),
}

/// Write `value` to `path` as indented JSON, creating parent directories as needed.
/// An existing file is overwritten.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OutputError> {
    let f = create_with_parents(path)?;
    serde_json::to_writer_pretty(BufWriter::new(f), value)
        .map_err(|e| OutputError::JsonWrite(path.to_path_buf(), e))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
    let f = File::open(path)
        .map_err(|e| OutputError::OpenFile(path.to_path_buf(), e))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| OutputError::JsonRead(path.to_path_buf(), e))
}

/// Write `rows` to `path` as CSV with a header taken from the row type's field names.
///
/// Returns the number of data rows written, not counting the header.
pub fn write_csv<R: Serialize>(path: &Path, rows: &[R]) -> Result<usize, OutputError> {
    let f = create_with_parents(path)?;
    let mut wtr = csv::Writer::from_writer(BufWriter::new(f));
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| OutputError::CsvWrite(path.to_path_buf(), e))?;
    }
    wtr.flush()
        .map_err(|e| OutputError::CsvWrite(path.to_path_buf(), e.into()))?;
    Ok(rows.len())
}

fn create_with_parents(path: &Path) -> Result<File, OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::CreateDir(parent.to_path_buf(), e))?;
        }
    }
    File::create(path).map_err(|e| OutputError::CreateFile(path.to_path_buf(), e))
}

/// (De)serialize a list of key/value pairs as a JSON object, keeping the list order on output.
pub(crate) mod ordered_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, V>(pairs: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer, V: Serialize
    {
        serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where D: Deserializer<'de>, V: Deserialize<'de>
    {
        let map = BTreeMap::<String, V>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}
