//! CSV and trajectory image writers
//!
//! Layout of a condition table (one row per particle):
//!
//! ```text
//! Avg_Obj_Size | Std_Obj_Size | File | Particle | FirstX | FirstY | First_Frame | Avg Speed | Speed Std | Path Length | Displacement | 0.2 | 0.4 | ...
//! -------------|--------------|------|----------|--------|--------|-------------|-----------|-----------|-------------|--------------|-----|-----|
//!     14.86    |     7.38     |  1   |    0     |  150   |  150   |      0      |    2.5    |   3.342   |     ...     |     18.6     | 1.2 | 2.3 |
//! ```
//!
//! Trailing columns are instantaneous speeds, headed by the elapsed time in
//! seconds at nominal frame spacing. Particles tracked for fewer intervals
//! than the longest track leave the remaining cells empty. Missing values
//! (`NaN`) are written as empty cells.

use std::collections::BTreeMap;
use std::path::Path;

use crate::kinematics::ParticleRow;
use crate::observation::Observation;
use crate::summary::ConditionSummary;
use crate::Result;

/// Fixed leading columns of a condition table
pub const CONDITION_COLUMNS: [&str; 11] = [
    "Avg_Obj_Size",
    "Std_Obj_Size",
    "File",
    "Particle",
    "FirstX",
    "FirstY",
    "First_Frame",
    "Avg Speed",
    "Speed Std",
    "Path Length",
    "Displacement",
];

/// Columns of the cross-condition summary
pub const SUMMARY_COLUMNS: [&str; 5] = [
    "Condition",
    "# of Files",
    "Average Speed",
    "Speed SEM",
    "Total # of Objects",
];

/// Columns of the full per-frame table
pub const FULL_OBJECT_COLUMNS: [&str; 6] = ["File", "particle", "frame", "x", "y", "mass"];

/// Stroke colours cycled across trajectories
const TRAJECTORY_COLOURS: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Header labels for the speed columns: elapsed seconds at each interval.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn interval_headers(intervals: usize, fps: f64) -> Vec<String> {
    (1..=intervals)
        .map(|k| (k as f64 / fps).to_string())
        .collect()
}

/// Write the joined particle table of one condition.
///
/// # Errors
///
/// Returns error if the file cannot be created or written.
pub fn write_condition_table<P: AsRef<Path>>(path: P, rows: &[ParticleRow], fps: f64) -> Result<()> {
    let intervals = rows
        .iter()
        .map(|row| row.particle.speeds.len())
        .max()
        .unwrap_or(0);

    let mut writer = csv::Writer::from_path(path.as_ref())?;

    let mut header: Vec<String> = CONDITION_COLUMNS.iter().map(ToString::to_string).collect();
    header.extend(interval_headers(intervals, fps));
    writer.write_record(&header)?;

    for row in rows {
        let record = &row.particle;
        let mut fields = vec![
            cell(row.size.average),
            cell(row.size.std_dev),
            row.file.clone(),
            record.particle.to_string(),
            cell(record.first_x),
            cell(record.first_y),
            record.first_frame.to_string(),
            cell(record.average_speed),
            cell(record.speed_std_dev),
            cell(record.path_length),
            cell(record.total_displacement),
        ];
        fields.extend(record.speeds.iter().copied().map(cell));
        fields.resize(CONDITION_COLUMNS.len() + intervals, String::new());
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the unreduced per-frame table of one condition.
///
/// # Errors
///
/// Returns error if the file cannot be created or written.
pub fn write_full_object_table<P: AsRef<Path>>(
    path: P,
    entries: &[(String, Observation)],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(FULL_OBJECT_COLUMNS)?;

    for (file, observation) in entries {
        writer.write_record([
            file.clone(),
            observation.particle.to_string(),
            observation.frame.to_string(),
            cell(observation.x),
            cell(observation.y),
            cell(observation.mass),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the cross-condition summary.
///
/// # Errors
///
/// Returns error if the file cannot be created or written.
pub fn write_summary<P: AsRef<Path>>(path: P, summaries: &[ConditionSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(SUMMARY_COLUMNS)?;

    for summary in summaries {
        writer.write_record([
            summary.condition.clone(),
            summary.file_count.to_string(),
            cell(summary.average_speed),
            cell(summary.speed_sem),
            summary.particle_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Render every trajectory of one file as an SVG image.
///
/// One polyline per particle, in pixel coordinates with y pointing down like
/// the source frames. Observations are ordered by frame within each particle.
///
/// # Errors
///
/// Returns error if the file cannot be written.
pub fn write_trajectory_svg<P: AsRef<Path>>(path: P, observations: &[Observation]) -> Result<()> {
    std::fs::write(path.as_ref(), render_trajectories(observations))?;
    Ok(())
}

/// Build the SVG document for [`write_trajectory_svg`].
#[must_use]
pub fn render_trajectories(observations: &[Observation]) -> String {
    let mut tracks: BTreeMap<i64, Vec<&Observation>> = BTreeMap::new();
    for observation in observations
        .iter()
        .filter(|o| o.x.is_finite() && o.y.is_finite())
    {
        tracks.entry(observation.particle).or_default().push(observation);
    }

    let width = observations
        .iter()
        .map(|o| o.x)
        .filter(|x| x.is_finite())
        .fold(1.0_f64, f64::max)
        .ceil();
    let height = observations
        .iter()
        .map(|o| o.y)
        .filter(|y| y.is_finite())
        .fold(1.0_f64, f64::max)
        .ceil();

    let polylines: String = tracks
        .iter_mut()
        .enumerate()
        .map(|(index, (particle, track))| {
            track.sort_by_key(|o| o.frame);
            let points: Vec<String> = track.iter().map(|o| format!("{},{}", o.x, o.y)).collect();
            let colour = TRAJECTORY_COLOURS[index % TRAJECTORY_COLOURS.len()];
            format!(
                "  <polyline data-particle=\"{particle}\" fill=\"none\" stroke=\"{colour}\" stroke-width=\"0.5\" points=\"{}\"/>\n",
                points.join(" ")
            )
        })
        .collect();

    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {width} {height}\" width=\"{width}\" height=\"{height}\">\n{polylines}</svg>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::reduce;

    #[test]
    fn test_interval_headers() {
        assert_eq!(interval_headers(3, 2.0), vec!["0.5", "1", "1.5"]);
    }

    #[test]
    fn test_condition_table_pads_short_rows() {
        let observations = vec![
            Observation::new(0, 0, 0.0, 0.0, 255.0),
            Observation::new(0, 1, 3.0, 4.0, 255.0),
            Observation::new(0, 2, 3.0, 5.0, 255.0),
            Observation::new(1, 0, 0.0, 0.0, 255.0),
            Observation::new(1, 1, 1.0, 0.0, 255.0),
        ];
        let rows = ParticleRow::labelled(
            reduce(&observations, 1.0, 1.0, 255.0).unwrap().into_rows(),
            "6",
        );
        let path = std::env::temp_dir().join("philtrack_export_condition.csv");
        write_condition_table(&path, &rows, 1.0).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Displacement,1,2"));
        assert!(lines[1].starts_with("1,0,6,0,0,0,0,3,2,6,"));
        assert!(lines[2].ends_with(",1,"));
    }

    #[test]
    fn test_nan_cells_are_empty() {
        assert_eq!(cell(f64::NAN), "");
        assert_eq!(cell(2.5), "2.5");
    }

    #[test]
    fn test_render_trajectories_one_polyline_per_particle() {
        let observations = vec![
            Observation::new(0, 1, 2.0, 2.0, 1.0),
            Observation::new(0, 0, 1.0, 1.0, 1.0),
            Observation::new(3, 0, 5.0, 5.0, 1.0),
        ];
        let svg = render_trajectories(&observations);

        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains(r#"points="1,1 2,2""#));
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 5 5""#));
        assert!(svg.ends_with("/>\n</svg>\n"));
    }
}
