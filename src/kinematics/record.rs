//! Per-particle derived records

use serde::{Deserialize, Serialize};

/// Kinematics of one particle with at least two observations.
///
/// Distances are in physical units (pixels × pixel size) and speeds in
/// physical units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    /// Particle identity
    pub particle: i64,
    /// x position at the first observation, in pixels
    pub first_x: f64,
    /// y position at the first observation, in pixels
    pub first_y: f64,
    /// Frame of the first observation
    pub first_frame: i64,
    /// Straight-line distance between first and last observation
    pub total_displacement: f64,
    /// Mean of the non-missing instantaneous speeds
    pub average_speed: f64,
    /// Population standard deviation of the same speeds
    pub speed_std_dev: f64,
    /// Sum of per-interval distances travelled at nominal frame spacing
    pub path_length: f64,
    /// Instantaneous speed for each consecutive pair of observations
    pub speeds: Vec<f64>,
}

impl ParticleRecord {
    /// Number of observations the record was derived from.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        self.speeds.len() + 1
    }
}

/// Brightness-normalized size statistics of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRecord {
    /// Particle identity
    pub particle: i64,
    /// Mean normalized size, rounded to 2 decimals
    pub average: f64,
    /// Population standard deviation of normalized size, rounded to 2 decimals
    pub std_dev: f64,
}

/// One output row: a particle's kinematics joined with its size statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleRow {
    /// Label of the file the particle was tracked in
    pub file: String,
    /// Size statistics
    pub size: SizeRecord,
    /// Kinematics
    pub particle: ParticleRecord,
}

impl ParticleRow {
    /// Attach a file label to every row, consuming them.
    #[must_use]
    pub fn labelled(rows: Vec<Self>, file: &str) -> Vec<Self> {
        rows.into_iter()
            .map(|mut row| {
                row.file = file.to_string();
                row
            })
            .collect()
    }
}
