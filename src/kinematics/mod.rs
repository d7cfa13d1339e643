//! Kinematic reduction of linked observations
//!
//! Turns one file's linked observation table into one [`ParticleRow`] per
//! particle seen in at least two frames:
//!
//! ```text
//! Particle | FirstX | FirstY | First_Frame | Displacement | v(1/fps) | v(2/fps) | ...
//! ---------|--------|--------|-------------|--------------|----------|----------|
//!    0     |  150   |  150   |      0      |     18.6     |   1.2    |   2.3    |
//! ```
//!
//! Particles seen once carry no velocity information and are dropped without
//! a diagnostic.
//!
//! Observations are re-sorted by frame within each particle; consecutive
//! observations must then have strictly increasing frames. A repeated or
//! decreasing frame is reported as [`Error::FrameOrder`] instead of yielding an
//! infinite or negative speed.

mod record;
pub mod stats;

pub use record::{ParticleRecord, ParticleRow, SizeRecord};

use std::collections::BTreeMap;

use tracing::debug;

use crate::observation::Observation;
use crate::settings::TrackingSettings;
use crate::{Error, Result};
use stats::{nan_mean, nan_population_std, nan_sum, round_to};

/// Decimal places kept on size statistics
const SIZE_DECIMALS: i32 = 2;

/// Output of reducing one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reduction {
    rows: Vec<ParticleRow>,
    single_observation_particles: usize,
}

impl Reduction {
    /// Joined rows, ordered by particle id.
    #[must_use]
    pub fn rows(&self) -> &[ParticleRow] {
        &self.rows
    }

    /// Consume the reduction, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<ParticleRow> {
        self.rows
    }

    /// Number of particles dropped for having a single observation.
    #[must_use]
    pub const fn single_observation_particles(&self) -> usize {
        self.single_observation_particles
    }
}

/// Group observations by particle id and sort each group by frame.
///
/// Returns the groups with two or more observations and the number of
/// single-observation groups left out.
fn partition(observations: &[Observation]) -> (BTreeMap<i64, Vec<Observation>>, usize) {
    let mut groups: BTreeMap<i64, Vec<Observation>> = BTreeMap::new();
    for observation in observations {
        groups
            .entry(observation.particle)
            .or_default()
            .push(*observation);
    }

    let before = groups.len();
    groups.retain(|_, track| track.len() > 1);
    let dropped = before - groups.len();

    for track in groups.values_mut() {
        track.sort_by_key(|o| o.frame);
    }

    (groups, dropped)
}

/// Derive the kinematic record of one frame-sorted track.
///
/// # Errors
///
/// Returns `Error::FrameOrder` if two consecutive observations share a frame,
/// or `Error::InvalidInput` if their frame gap does not fit in an `i64`.
#[allow(clippy::cast_precision_loss)]
fn particle_record(track: &[Observation], pixel_size: f64, fps: f64) -> Result<ParticleRecord> {
    let (Some(first), Some(last)) = (track.first(), track.last()) else {
        return Err(Error::InvalidInput("empty particle track".to_string()));
    };
    let seconds_per_frame = fps.recip();

    let speeds = track
        .windows(2)
        .map(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            let frame_delta = current.frame.checked_sub(previous.frame).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Frame gap {}..{} of particle {} is out of range",
                    previous.frame, current.frame, current.particle
                ))
            })?;
            if frame_delta <= 0 {
                return Err(Error::FrameOrder {
                    particle: current.particle,
                    previous_frame: previous.frame,
                    frame: current.frame,
                });
            }
            let elapsed = frame_delta as f64 * seconds_per_frame;
            Ok(previous.distance_to(current) * pixel_size / elapsed)
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(ParticleRecord {
        particle: first.particle,
        first_x: first.x,
        first_y: first.y,
        first_frame: first.frame,
        total_displacement: first.distance_to(last) * pixel_size,
        average_speed: nan_mean(&speeds),
        speed_std_dev: nan_population_std(&speeds),
        path_length: nan_sum(&speeds) * seconds_per_frame,
        speeds,
    })
}

/// Size statistics of one track.
fn size_record(track: &[Observation], brightness_scale: f64) -> SizeRecord {
    let sizes: Vec<f64> = track.iter().map(|o| o.mass / brightness_scale).collect();
    SizeRecord {
        particle: track.first().map_or(0, |o| o.particle),
        average: round_to(nan_mean(&sizes), SIZE_DECIMALS),
        std_dev: round_to(nan_population_std(&sizes), SIZE_DECIMALS),
    }
}

/// Size statistics for every particle with at least two observations,
/// ordered by particle id.
#[must_use]
pub fn size_records(observations: &[Observation], brightness_scale: f64) -> Vec<SizeRecord> {
    let (groups, _) = partition(observations);
    groups
        .values()
        .map(|track| size_record(track, brightness_scale))
        .collect()
}

/// Reduce one file's observations into joined particle rows.
///
/// Rows carry an empty file label; see [`ParticleRow::labelled`].
///
/// # Arguments
///
/// * `observations` - Linked observations, in any order
/// * `pixel_size` - Physical size of one pixel
/// * `fps` - Nominal frame rate
/// * `brightness_scale` - Divisor applied to `mass` for size statistics
///
/// # Errors
///
/// Returns `Error::FrameOrder` if a particle has two observations in the same
/// frame, or `Error::InvalidInput` if a frame gap overflows.
pub fn reduce(
    observations: &[Observation],
    pixel_size: f64,
    fps: f64,
    brightness_scale: f64,
) -> Result<Reduction> {
    let (groups, single_observation_particles) = partition(observations);

    let rows = groups
        .values()
        .map(|track| {
            Ok(ParticleRow {
                file: String::new(),
                size: size_record(track, brightness_scale),
                particle: particle_record(track, pixel_size, fps)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        particles = rows.len(),
        dropped = single_observation_particles,
        "Reduced observation table"
    );

    Ok(Reduction {
        rows,
        single_observation_particles,
    })
}

/// Reduce with the scale factors taken from `settings`.
///
/// # Errors
///
/// See [`reduce`].
pub fn reduce_with(observations: &[Observation], settings: &TrackingSettings) -> Result<Reduction> {
    reduce(
        observations,
        settings.pixel_size,
        settings.fps,
        settings.brightness_scale,
    )
}
