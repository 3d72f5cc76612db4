//! JSON datasets for seeding and snapshotting the in-memory store.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Day, Proposal, Slot, TripRecord};

/// Flat document lists, one per collection.
///
/// ```json
/// { "trips": [...], "days": [...], "slots": [...], "proposals": [...] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDataset {
    #[serde(default)]
    pub trips: Vec<TripRecord>,
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
}

/// Errors raised while reading or writing a dataset file.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file could not be read or written.
    #[error("failed to access dataset at {path}: {source}")]
    Io {
        /// Path to the dataset file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid dataset.
    #[error("invalid dataset at {path}: {source}")]
    Parse {
        /// Path to the dataset file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl DatasetError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a dataset from a JSON file.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
///
/// use tripboard::outbound::memory::load_dataset;
///
/// let dataset = load_dataset(Path::new("fixtures/demo-trip.json"))?;
/// assert!(!dataset.trips.is_empty());
/// # Ok::<(), tripboard::outbound::memory::DatasetError>(())
/// ```
pub fn load_dataset(path: &Path) -> Result<StoreDataset, DatasetError> {
    let (directory, file_name) = open_parent(path)?;
    let raw = directory
        .read_to_string(file_name)
        .map_err(|error| DatasetError::io(path, error))?;
    serde_json::from_str(&raw).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `dataset` as pretty-printed JSON.
pub fn save_dataset(path: &Path, dataset: &StoreDataset) -> Result<(), DatasetError> {
    let (directory, file_name) = open_parent(path)?;
    let json = serde_json::to_vec_pretty(dataset).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    directory
        .write(file_name, json)
        .map_err(|error| DatasetError::io(path, error))
}

fn open_parent(path: &Path) -> Result<(Dir, &Path), DatasetError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().map(Path::new).ok_or_else(|| {
        DatasetError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "dataset path has no file name"),
        )
    })?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|error| DatasetError::io(path, error))?;
    Ok((directory, file_name))
}
