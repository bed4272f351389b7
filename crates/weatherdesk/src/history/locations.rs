use serde::{Deserialize, Serialize};
use slog::{debug, info};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::{HistoryError, HistoryStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedLocations {
    #[serde(default)]
    locations: Vec<String>,
}

/// Replaces the saved locations file in one rename
pub(crate) fn write_locations(path: &Path, locations: &[String]) -> Result<(), HistoryError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(
        tmp.as_file_mut(),
        &SavedLocations {
            locations: locations.to_vec(),
        },
    )?;
    tmp.as_file_mut().flush()?;
    tmp.persist(path).map_err(|e| HistoryError::Io(e.error))?;
    Ok(())
}

fn read_locations(path: &Path) -> Result<Vec<String>, HistoryError> {
    let file = File::open(path)?;
    let saved: SavedLocations = serde_json::from_reader(BufReader::new(file))?;
    Ok(saved.locations)
}

impl HistoryStore {
    /// Adds `city` to the saved set. Returns false when it was already
    /// there; names are compared case-sensitively.
    pub fn save_location(&self, city: &str) -> Result<bool, HistoryError> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(false);
        }
        self.with_storage(|store| {
            let mut locations = read_locations(&store.paths.locations)?;
            if locations.iter().any(|saved| saved == city) {
                debug!(store.logger, "location already saved: {}", city);
                return Ok(false);
            }
            locations.push(city.to_string());
            write_locations(&store.paths.locations, &locations)?;
            info!(store.logger, "saved location: {}", city);
            Ok(true)
        })
    }

    /// Saved locations in the order they were added
    pub fn list_locations(&self) -> Result<Vec<String>, HistoryError> {
        self.with_storage(|store| read_locations(&store.paths.locations))
    }
}
