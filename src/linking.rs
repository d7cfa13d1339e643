//! Linking stage seam
//!
//! Detection and linking (turning frames into per-particle trajectories) are
//! done by an external tracker. [`Linker`] is where that collaborator plugs
//! in; [`PrelinkedTables`] reads tables the tracker has already written.
//!
//! Error contract: a file the linker cannot turn into observations is an
//! [`Error::Linking`], which the pipeline records and skips. Any other error
//! (an unreadable file, for instance) propagates to the caller.

use std::path::Path;

use tracing::debug;

use crate::observation::ObservationTable;
use crate::settings::TrackingSettings;
use crate::{Error, Result};

/// Produces the linked observation table for one input file.
pub trait Linker {
    /// Link the detections of `path` into an observation table.
    ///
    /// `settings` carries the detection and linking parameters
    /// (`object_area`, `search_range`, `trk_memory`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Linking` if this file cannot be linked; other errors
    /// abort the run.
    fn link(&self, path: &Path, settings: &TrackingSettings) -> Result<ObservationTable>;
}

/// Reads linked observation tables written by an external tracker.
///
/// `.parquet` files are read through Arrow; anything else is read as CSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrelinkedTables;

impl PrelinkedTables {
    /// Create the reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Linker for PrelinkedTables {
    fn link(&self, path: &Path, _settings: &TrackingSettings) -> Result<ObservationTable> {
        let is_parquet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

        let table = if is_parquet {
            ObservationTable::load_parquet(path)
        } else {
            ObservationTable::load_csv(path)
        };

        // A table that exists but does not hold linked observations is a
        // linking failure for this file only
        let table = table.map_err(|e| match e {
            Error::StorageError(reason) => Error::Linking {
                file: path.to_path_buf(),
                reason,
            },
            Error::Csv(err) if !matches!(err.kind(), csv::ErrorKind::Io(_)) => Error::Linking {
                file: path.to_path_buf(),
                reason: err.to_string(),
            },
            other => other,
        })?;

        // Validate the shape up front so reduction never sees a partial table
        if let Err(Error::StorageError(reason)) = table.observations() {
            return Err(Error::Linking {
                file: path.to_path_buf(),
                reason,
            });
        }

        debug!(file = %path.display(), rows = table.num_rows(), "Loaded linked table");
        Ok(table)
    }
}
