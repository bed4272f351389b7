use csv::{ReaderBuilder, WriterBuilder};
use slog::{debug, info, warn, Logger};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, Duration,
    OffsetDateTime,
};
use weatherdesk_core::{ensure_dir, file_is_empty, path_exists};

use crate::{Clock, HistoryError, HistoryRecord, Observation, SystemClock, HISTORY_HEADER};

pub const HISTORY_FILE: &str = "weather_history.csv";
pub const LOCATIONS_FILE: &str = "saved_locations.json";
pub const BACKUP_DIR: &str = "backups";

/// Locations of every file the store owns
#[derive(Debug, Clone, PartialEq)]
pub struct StorePaths {
    pub data_dir: PathBuf,
    pub history: PathBuf,
    pub locations: PathBuf,
    pub backups: PathBuf,
}

impl StorePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            history: data_dir.join(HISTORY_FILE),
            locations: data_dir.join(LOCATIONS_FILE),
            backups: data_dir.join(BACKUP_DIR),
            data_dir,
        }
    }
}

/// Append-only log of observations plus the saved locations set.
///
/// Not safe for concurrent writers: hosts that can run actions in parallel
/// must serialize `append` and `prune` behind a single lock.
pub struct HistoryStore {
    pub(crate) logger: Logger,
    pub(crate) paths: StorePaths,
    pub(crate) clock: Arc<dyn Clock>,
}

impl HistoryStore {
    pub fn new(logger: Logger, data_dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(logger, data_dir, Arc::new(SystemClock))
    }

    pub fn with_clock(logger: Logger, data_dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            logger,
            paths: StorePaths::new(data_dir),
            clock,
        }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Creates any missing directory, the log header and the empty
    /// locations set. Existing data is never touched.
    pub fn init(&self) -> Result<(), HistoryError> {
        for dir in [&self.paths.data_dir, &self.paths.backups] {
            if ensure_dir(dir)? {
                info!(self.logger, "folder created: {}", dir.display());
            }
        }

        if !path_exists(&self.paths.locations) {
            crate::history::locations::write_locations(&self.paths.locations, &[])?;
            info!(
                self.logger,
                "created saved locations: {}",
                self.paths.locations.display()
            );
        }

        if !path_exists(&self.paths.history) || file_is_empty(&self.paths.history)? {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_path(&self.paths.history)?;
            writer.write_record(HISTORY_HEADER)?;
            writer.flush()?;
            info!(
                self.logger,
                "created history log: {}",
                self.paths.history.display()
            );
        }
        Ok(())
    }

    /// Adds `observation` as the newest row, stamped with the current time.
    ///
    /// Rows are stored in °C and m/s whatever the observation's units, so an
    /// imperial reading reads back converted rather than as observed.
    pub fn append(&self, city: &str, observation: &Observation) -> Result<HistoryRecord, HistoryError> {
        self.with_storage(|store| store.append_record(city, observation))
    }

    /// Records newer than `now - window_days`, optionally for one city,
    /// oldest first.
    pub fn query(
        &self,
        city: Option<&str>,
        window_days: u32,
    ) -> Result<Vec<HistoryRecord>, HistoryError> {
        let cutoff = self.cutoff(window_days);
        let mut records: Vec<HistoryRecord> = self
            .with_storage(|store| store.read_records())?
            .into_iter()
            .filter(|record| city.map_or(true, |c| record.city == c))
            .filter(|record| record.timestamp >= cutoff)
            .collect();
        records.sort_by_key(|record| record.timestamp);
        debug!(
            self.logger,
            "history query city={:?} days={} -> {} rows",
            city,
            window_days,
            records.len()
        );
        Ok(records)
    }

    /// Every row in the log, in insertion order
    pub fn all_records(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        self.with_storage(|store| store.read_records())
    }

    /// Rewrites the log keeping only rows inside the trailing window and
    /// returns how many remain. The rewrite is all-or-nothing.
    pub fn prune(&self, window_days: u32) -> Result<usize, HistoryError> {
        self.with_storage(|store| store.prune_with(window_days, write_log))
    }

    /// Windows reaching past the earliest representable date keep everything.
    pub(crate) fn cutoff(&self, window_days: u32) -> OffsetDateTime {
        self.clock
            .now()
            .checked_sub(Duration::days(i64::from(window_days)))
            .unwrap_or_else(|| Date::MIN.midnight().assume_utc())
    }

    /// Runs `op`, re-initializing the storage once if a backing file has
    /// gone missing or become unreadable.
    pub(crate) fn with_storage<T>(
        &self,
        op: impl Fn(&Self) -> Result<T, HistoryError>,
    ) -> Result<T, HistoryError> {
        match op(self) {
            Err(e) if e.is_storage_failure() => {
                warn!(self.logger, "history storage missing, reinitializing: {}", e);
                self.init()
                    .map_err(|e| HistoryError::StorageUnavailable(e.to_string()))?;
                op(self).map_err(|e| {
                    if e.is_storage_failure() {
                        HistoryError::StorageUnavailable(e.to_string())
                    } else {
                        e
                    }
                })
            }
            other => other,
        }
    }

    pub(crate) fn read_records(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.paths.history)?;
        let records = reader
            .deserialize()
            .collect::<Result<Vec<HistoryRecord>, csv::Error>>()?;
        Ok(records)
    }

    fn append_record(&self, city: &str, observation: &Observation) -> Result<HistoryRecord, HistoryError> {
        let last = self.last_timestamp()?;
        let now = self.clock.now();
        let timestamp = match last {
            Some(last) if last > now => last,
            _ => now,
        };
        let record = HistoryRecord::from_observation(city, observation, timestamp);

        let file = OpenOptions::new().append(true).open(&self.paths.history)?;
        let needs_header = file.metadata()?.len() == 0;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(HISTORY_HEADER)?;
        }
        writer.serialize(&record)?;
        writer.flush()?;

        debug!(self.logger, "logged weather for {}", city);
        Ok(record)
    }

    /// Timestamp of the final row, or `None` when the log is empty or that
    /// field does not parse. Only the timestamp column is decoded so a bad
    /// row elsewhere never blocks an append.
    fn last_timestamp(&self) -> Result<Option<OffsetDateTime>, HistoryError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.paths.history)?;
        let column = reader
            .byte_headers()?
            .iter()
            .position(|name| name == b"timestamp");

        let mut last = None;
        for row in reader.byte_records() {
            last = Some(row?);
        }

        Ok(column
            .zip(last)
            .and_then(|(column, row)| {
                row.get(column)
                    .and_then(|field| std::str::from_utf8(field).ok())
                    .map(str::to_owned)
            })
            .and_then(|field| OffsetDateTime::parse(field.trim(), &Rfc3339).ok()))
    }

    pub(crate) fn prune_with<F>(&self, window_days: u32, write: F) -> Result<usize, HistoryError>
    where
        F: Fn(&mut dyn Write, &[HistoryRecord]) -> Result<(), HistoryError>,
    {
        let cutoff = self.cutoff(window_days);
        let records = self.read_records()?;
        let before = records.len();
        let retained: Vec<HistoryRecord> = records
            .into_iter()
            .filter(|record| record.timestamp >= cutoff)
            .collect();

        self.replace_log(&retained, write)
            .map_err(|e| HistoryError::PruneFailed(e.to_string()))?;

        info!(
            self.logger,
            "pruned history to {} days: kept {} of {} rows",
            window_days,
            retained.len(),
            before
        );
        Ok(retained.len())
    }

    /// Writes `records` to a temp file beside the log, then renames it over
    /// the log. On any failure the temp file is dropped and the log is left
    /// as it was.
    fn replace_log<F>(&self, records: &[HistoryRecord], write: F) -> Result<(), HistoryError>
    where
        F: Fn(&mut dyn Write, &[HistoryRecord]) -> Result<(), HistoryError>,
    {
        let dir = self
            .paths
            .history
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        write(tmp.as_file_mut(), records)?;
        if let Ok(metadata) = fs::metadata(&self.paths.history) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.paths.history)
            .map_err(|e| HistoryError::Io(e.error))?;
        Ok(())
    }

    /// Picks a non-existing `<prefix>_<YYYYmmdd_HHMMSS>.<ext>` path in the
    /// backups folder, adding a counter when the second is already taken.
    pub(crate) fn artifact_path(&self, prefix: &str, extension: &str) -> Result<PathBuf, HistoryError> {
        ensure_dir(&self.paths.backups)?;
        let stamp = self
            .clock
            .now()
            .format(format_description!("[year][month][day]_[hour][minute][second]"))?;

        let mut candidate = self
            .paths
            .backups
            .join(format!("{}_{}.{}", prefix, stamp, extension));
        let mut counter = 1;
        while path_exists(&candidate) {
            candidate = self
                .paths
                .backups
                .join(format!("{}_{}_{}.{}", prefix, stamp, counter, extension));
            counter += 1;
        }
        Ok(candidate)
    }

    /// Removes a partially written artifact after a failure
    pub(crate) fn discard_artifact(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            warn!(self.logger, "failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Serializes the full log (header included) to `out`
pub(crate) fn write_log(out: &mut dyn Write, records: &[HistoryRecord]) -> Result<(), HistoryError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(HISTORY_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Creates an empty file at `path`, used by exports that stream into it
pub(crate) fn create_artifact(path: &Path) -> Result<File, HistoryError> {
    Ok(OpenOptions::new().write(true).create_new(true).open(path)?)
}
