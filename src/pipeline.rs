//! Batch driver: conditions → files → reduction → CSV
//!
//! Workflow for each condition:
//!
//! 1. For each file, in order:
//!    - link detections into an observation table (skip the file on a
//!      linking failure, recording a diagnostic)
//!    - reduce the table into particle rows and label them with the file number
//!    - optionally render the file's trajectories and keep its raw rows
//! 2. Write `<condition>.csv` (and `<condition>-Full Object Data.csv`)
//! 3. Fold the rows into the condition summary
//!
//! After all conditions, `Summary.csv` holds one row per condition.
//!
//! Processing is single-threaded and strictly ordered; each file is fully read,
//! reduced and appended before the next one starts.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::export::{
    write_condition_table, write_full_object_table, write_summary, write_trajectory_svg,
};
use crate::kinematics::{reduce_with, ParticleRow};
use crate::linking::Linker;
use crate::observation::Observation;
use crate::settings::TrackingSettings;
use crate::summary::{ConditionAccumulator, ConditionSummary};
use crate::{Error, Result};

/// File name of the cross-condition summary
pub const SUMMARY_FILE: &str = "Summary.csv";

/// Identifies which input file a row came from.
///
/// The label is the trailing number of the file stem (`Myosin06.tif` → `6`),
/// or the whole stem when it does not end in digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLabel {
    stem: String,
    label: String,
}

impl FileLabel {
    /// Derive the label of `path`.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (_, digits) = split_trailing_digits(&stem);
        let label = digits
            .parse::<u64>()
            .map_or_else(|_| stem.clone(), |n| n.to_string());
        Self { stem, label }
    }

    /// File stem, used to name per-file outputs.
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Label written into the `File` column.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

fn split_trailing_digits(stem: &str) -> (&str, &str) {
    let split = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(stem.len(), |(i, _)| i);
    stem.split_at(split)
}

/// A named group of input files representing one experimental treatment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    name: String,
    files: Vec<PathBuf>,
}

impl Condition {
    /// Create a condition from a name and its files.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the name or the file list is empty.
    pub fn new(name: impl Into<String>, files: Vec<PathBuf>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("condition name must not be empty".to_string()));
        }
        if files.is_empty() {
            return Err(Error::InvalidInput(format!("condition '{name}' has no files")));
        }
        Ok(Self { name, files })
    }

    /// Create a condition named after its first file, minus the file number
    /// (`100ugMyosin06.tif` → `100ugMyosin`).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `files` is empty or no name can be
    /// derived.
    pub fn from_files(files: Vec<PathBuf>) -> Result<Self> {
        let first = files
            .first()
            .ok_or_else(|| Error::InvalidInput("condition has no files".to_string()))?;
        let stem = FileLabel::from_path(first).stem;
        let (prefix, _) = split_trailing_digits(&stem);
        let name = prefix.trim_end_matches(['-', '_', ' ']).to_string();
        Self::new(name, files)
    }

    /// Condition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input files, in processing order.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// One summary per condition, in input order
    pub summaries: Vec<ConditionSummary>,
    /// One message per skipped file
    pub diagnostics: Vec<String>,
    /// Files attempted, skipped ones included
    pub files_processed: usize,
    /// Every file written
    pub outputs: Vec<PathBuf>,
}

impl RunReport {
    /// Diagnostics joined into one block, one message per skipped file.
    #[must_use]
    pub fn diagnostics_text(&self) -> String {
        self.diagnostics.iter().map(|d| format!("{d}\n")).collect()
    }
}

/// Rows and raw observations collected for one condition.
#[derive(Default)]
struct ConditionTables {
    rows: Vec<ParticleRow>,
    full_objects: Vec<(String, Observation)>,
}

/// Runs conditions through a [`Linker`] and the reducer, writing outputs.
pub struct Pipeline<L: Linker> {
    settings: TrackingSettings,
    linker: L,
}

impl<L: Linker> Pipeline<L> {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `settings` fail validation.
    pub fn new(settings: TrackingSettings, linker: L) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, linker })
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &TrackingSettings {
        &self.settings
    }

    /// Process every condition and write all outputs.
    ///
    /// # Errors
    ///
    /// Linking failures are recorded in [`RunReport::diagnostics`] and do not
    /// fail the run. Anything else (unreadable files, `Error::FrameOrder`,
    /// output write failures) aborts it.
    pub fn run(&self, conditions: &[Condition]) -> Result<RunReport> {
        let output_dir = &self.settings.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let total_files: usize = conditions.iter().map(|c| c.files().len()).sum();
        let mut report = RunReport::default();

        for condition in conditions {
            let mut accumulator = ConditionAccumulator::new(condition.name());
            let mut tables = ConditionTables::default();

            for path in condition.files() {
                report.files_processed += 1;
                info!(
                    progress = report.files_processed,
                    total = total_files,
                    file = %path.display(),
                    "Processing file"
                );

                match self.process_file(path, &mut tables, &mut report.outputs) {
                    Ok(rows) => accumulator.add_file(&rows),
                    Err(e) if e.is_linking_failure() => {
                        warn!(file = %path.display(), error = %e, "Skipping file");
                        report.diagnostics.push(e.to_string());
                        accumulator.add_skipped_file();
                    }
                    Err(e) => return Err(e),
                }
            }

            let table_path = output_dir.join(format!("{}.csv", condition.name()));
            write_condition_table(&table_path, &tables.rows, self.settings.fps)?;
            report.outputs.push(table_path);

            if self.settings.full_obj_data {
                let full_path =
                    output_dir.join(format!("{}-Full Object Data.csv", condition.name()));
                write_full_object_table(&full_path, &tables.full_objects)?;
                report.outputs.push(full_path);
            }

            let summary = accumulator.finish();
            info!(
                condition = %summary.condition,
                particles = summary.particle_count,
                average_speed = summary.average_speed,
                "Condition complete"
            );
            report.summaries.push(summary);
        }

        let summary_path = output_dir.join(SUMMARY_FILE);
        write_summary(&summary_path, &report.summaries)?;
        report.outputs.push(summary_path);

        Ok(report)
    }

    /// Link, reduce and collect one file; returns the rows it contributed.
    #[instrument(skip(self, path, tables, outputs), fields(file = %path.display()))]
    fn process_file(
        &self,
        path: &Path,
        tables: &mut ConditionTables,
        outputs: &mut Vec<PathBuf>,
    ) -> Result<Vec<ParticleRow>> {
        let label = FileLabel::from_path(path);
        let table = self.linker.link(path, &self.settings)?;
        let observations = table.observations()?;

        let reduction = reduce_with(&observations, &self.settings)?;
        let rows = ParticleRow::labelled(reduction.into_rows(), label.label());

        if self.settings.paths {
            let image_path = self
                .settings
                .output_dir
                .join(format!("{}.svg", label.stem()));
            write_trajectory_svg(&image_path, &observations)?;
            outputs.push(image_path);
        }

        if self.settings.full_obj_data {
            tables.full_objects.extend(
                observations
                    .into_iter()
                    .map(|o| (label.label().to_string(), o)),
            );
        }

        tables.rows.extend(rows.iter().cloned());
        Ok(rows)
    }
}
