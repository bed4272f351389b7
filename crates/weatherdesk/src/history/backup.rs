use flate2::{write::GzEncoder, Compression};
use slog::info;
use std::path::{Path, PathBuf};

use crate::history::store::create_artifact;
use crate::{HistoryError, HistoryStore, HISTORY_FILE, LOCATIONS_FILE};

impl HistoryStore {
    /// Writes a gzipped tarball of the history log and saved locations to
    /// the backups folder and returns its path.
    pub fn backup(&self) -> Result<PathBuf, HistoryError> {
        // make sure both files exist so the archive is never partial
        self.init()?;
        let path = self.artifact_path("weather_backup", "tar.gz")?;

        if let Err(e) = self.write_archive(&path) {
            self.discard_artifact(&path);
            return Err(e);
        }
        info!(self.logger, "backup written to {}", path.display());
        Ok(path)
    }

    fn write_archive(&self, path: &Path) -> Result<(), HistoryError> {
        let file = create_artifact(path)?;
        let mut archive = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        archive.append_path_with_name(&self.paths.history, HISTORY_FILE)?;
        archive.append_path_with_name(&self.paths.locations, LOCATIONS_FILE)?;
        archive.into_inner()?.finish()?;
        Ok(())
    }
}
