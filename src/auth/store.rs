//! Persisted session-cookie record with self-healing load.
//!
//! The record is a JSON file `{"cookies": {...}, "generated_date": "YYYY-MM-DD"}`.
//! A record is either fully well-formed or treated as absent: any parse error
//! or schema mismatch deletes the backing file so a corrupt state can never
//! linger across runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::CookieMap;
use crate::config::REQUIRED_COOKIE_NAMES;

/// Errors that can occur while persisting a session record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error writing the record file.
    #[error("failed to write session record to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Serialization of the record failed.
    #[error("failed to serialize session record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A session cookie map plus the calendar date it was captured on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session cookies by name.
    pub cookies: CookieMap,
    /// Calendar date (no time component) the cookies were captured.
    pub generated_date: NaiveDate,
}

impl SessionRecord {
    /// Creates a record dated with the given calendar date.
    #[must_use]
    pub fn new(cookies: CookieMap, generated_date: NaiveDate) -> Self {
        Self {
            cookies,
            generated_date,
        }
    }

    /// True when the cookie map contains at least one required
    /// session-identifying name.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        REQUIRED_COOKIE_NAMES
            .iter()
            .any(|name| self.cookies.contains_key(*name))
    }
}

/// Reads and writes the session record at a fixed path.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted record.
    ///
    /// Fails soft: a missing file yields `None`; a parse error or a record
    /// without any required session cookie also yields `None` and deletes
    /// the backing file as a side effect.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    #[must_use]
    pub fn load(&self) -> Option<SessionRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no session record file");
                return None;
            }
            Err(error) => {
                warn!(%error, "failed to read session record file");
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "session record file is corrupt; deleting it");
                self.clear();
                return None;
            }
        };

        if !record.is_well_formed() {
            warn!("session record is missing required cookies; deleting it");
            self.clear();
            return None;
        }

        info!(date = %record.generated_date, "loaded session record");
        Some(record)
    }

    /// Overwrites the backing file with the record.
    ///
    /// Writes to a sibling temp file and renames it over the target so a
    /// crash mid-write is not read back as a valid record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on serialization or filesystem failure.
    #[instrument(level = "debug", skip(self, record), fields(path = %self.path.display()))]
    pub fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(record)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(date = %record.generated_date, "session record saved");
        Ok(())
    }

    /// Deletes the backing file. Best-effort; a missing file is not an error.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "session record file removed"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(%error, "failed to remove session record file"),
        }
    }
}
