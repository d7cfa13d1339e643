//! Per-condition summary statistics
//!
//! A quick cross-condition glance (condition A is faster than condition B)
//! computed over every instantaneous speed of every particle in a condition.

use serde::{Deserialize, Serialize};

use crate::kinematics::stats::{nan_mean, nan_population_std};
use crate::kinematics::ParticleRow;

/// Summary row for one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    /// Condition name
    pub condition: String,
    /// Number of files attempted in the condition
    pub file_count: usize,
    /// Mean of all non-missing instantaneous speeds
    pub average_speed: f64,
    /// Population std of all speeds over the square root of `particle_count`
    pub speed_sem: f64,
    /// Number of particle rows across all files
    pub particle_count: usize,
}

/// Running accumulator fed one file at a time.
#[derive(Debug, Clone)]
pub struct ConditionAccumulator {
    condition: String,
    file_count: usize,
    particle_count: usize,
    speeds: Vec<f64>,
}

impl ConditionAccumulator {
    /// Start an empty accumulator for a condition.
    #[must_use]
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            file_count: 0,
            particle_count: 0,
            speeds: Vec::new(),
        }
    }

    /// Count a file that produced no rows (e.g. skipped by the linker).
    pub fn add_skipped_file(&mut self) {
        self.file_count += 1;
    }

    /// Add one file's rows.
    pub fn add_file(&mut self, rows: &[ParticleRow]) {
        self.file_count += 1;
        self.particle_count += rows.len();
        self.speeds
            .extend(rows.iter().flat_map(|row| row.particle.speeds.iter().copied()));
    }

    /// Number of particle rows seen so far.
    #[must_use]
    pub const fn particle_count(&self) -> usize {
        self.particle_count
    }

    /// Compute the summary.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> ConditionSummary {
        let average_speed = nan_mean(&self.speeds);
        let speed_sem = nan_population_std(&self.speeds) / (self.particle_count as f64).sqrt();

        ConditionSummary {
            condition: self.condition,
            file_count: self.file_count,
            average_speed,
            speed_sem,
            particle_count: self.particle_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::{ParticleRecord, SizeRecord};

    fn row(speeds: Vec<f64>) -> ParticleRow {
        ParticleRow {
            file: "1".to_string(),
            size: SizeRecord {
                particle: 0,
                average: 1.0,
                std_dev: 0.0,
            },
            particle: ParticleRecord {
                particle: 0,
                first_x: 0.0,
                first_y: 0.0,
                first_frame: 0,
                total_displacement: 0.0,
                average_speed: 0.0,
                speed_std_dev: 0.0,
                path_length: 0.0,
                speeds,
            },
        }
    }

    #[test]
    fn test_sem_uses_particle_count() {
        let mut acc = ConditionAccumulator::new("Myosin");
        acc.add_file(&[row(vec![1.0, 3.0]), row(vec![1.0])]);
        acc.add_file(&[row(vec![3.0])]);
        let summary = acc.finish();

        // speeds [1, 3, 1, 3]: mean 2, population std 1, 3 rows
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.particle_count, 3);
        assert!((summary.average_speed - 2.0).abs() < 1e-12);
        assert!((summary.speed_sem - 1.0 / 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_skipped_files_count_toward_file_total() {
        let mut acc = ConditionAccumulator::new("Actin");
        acc.add_skipped_file();
        acc.add_file(&[row(vec![2.0])]);
        let summary = acc.finish();

        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.particle_count, 1);
    }

    #[test]
    fn test_empty_condition_is_nan() {
        let summary = ConditionAccumulator::new("Empty").finish();
        assert!(summary.average_speed.is_nan());
        assert!(summary.speed_sem.is_nan());
        assert_eq!(summary.particle_count, 0);
    }
}
