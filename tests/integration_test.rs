//! Integration test for the reduction pipeline
//!
//! Tests the complete batch flow:
//! 1. Write linked tables (Parquet and CSV) the way an external tracker would
//! 2. Run conditions through the pipeline
//! 3. Check the per-condition CSVs, the summary and the diagnostics

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::arrow::ArrowWriter;
use philtrack::linking::PrelinkedTables;
use philtrack::observation::{observation_schema, observations_to_batch, Observation};
use philtrack::pipeline::{Condition, Pipeline, SUMMARY_FILE};
use philtrack::settings::TrackingSettings;
use philtrack::Error;

/// Fresh, empty directory under the system temp dir
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("philtrack_it_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

fn write_parquet(path: &Path, observations: &[Observation]) {
    let batch = observations_to_batch(observations).expect("Failed to build batch");
    let file = File::create(path).expect("Failed to create Parquet file");
    let mut writer = ArrowWriter::try_new(file, Arc::new(observation_schema()), None)
        .expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn write_csv(path: &Path, observations: &[Observation]) {
    let mut text = String::from(",y,x,mass,frame,particle\n");
    for (i, o) in observations.iter().enumerate() {
        text.push_str(&format!("{i},{},{},{},{},{}\n", o.y, o.x, o.mass, o.frame, o.particle));
    }
    std::fs::write(path, text).expect("Failed to write CSV");
}

/// Particle 0 moves 5 px per frame, particle 1 moves 1 px per frame,
/// particle 2 is seen once.
fn movie_one() -> Vec<Observation> {
    vec![
        Observation::new(0, 0, 0.0, 0.0, 255.0),
        Observation::new(1, 0, 10.0, 10.0, 510.0),
        Observation::new(2, 0, 50.0, 50.0, 255.0),
        Observation::new(0, 1, 3.0, 4.0, 255.0),
        Observation::new(1, 1, 11.0, 10.0, 510.0),
        Observation::new(0, 2, 6.0, 8.0, 255.0),
    ]
}

fn movie_two() -> Vec<Observation> {
    vec![
        Observation::new(0, 4, 1.0, 1.0, 300.0),
        Observation::new(0, 5, 1.0, 4.0, 300.0),
    ]
}

fn settings(dir: &Path) -> TrackingSettings {
    TrackingSettings::builder()
        .fps(1.0)
        .pixel_size(1.0)
        .full_obj_data(true)
        .paths(true)
        .output_dir(dir.join("out"))
        .build()
        .expect("valid settings")
}

#[test]
fn test_pipeline_writes_condition_and_summary_tables() {
    let dir = scratch_dir("full_run");
    let first = dir.join("Myosin01.parquet");
    let second = dir.join("Myosin02.csv");
    write_parquet(&first, &movie_one());
    write_csv(&second, &movie_two());

    let condition = Condition::from_files(vec![first, second]).unwrap();
    assert_eq!(condition.name(), "Myosin");

    let pipeline = Pipeline::new(settings(&dir), PrelinkedTables::new()).unwrap();
    let report = pipeline.run(&[condition]).unwrap();

    assert!(report.diagnostics.is_empty());
    assert_eq!(report.files_processed, 2);

    let summary = &report.summaries[0];
    assert_eq!(summary.file_count, 2);
    assert_eq!(summary.particle_count, 3);
    // speeds: [5, 5], [1], [3] → mean 3.5
    assert!((summary.average_speed - 3.5).abs() < 1e-12);
    let std = (((1.5f64).powi(2) * 2.0 + 2.5f64.powi(2) + 0.5f64.powi(2)) / 4.0).sqrt();
    assert!((summary.speed_sem - std / 3f64.sqrt()).abs() < 1e-12);

    let out = dir.join("out");
    let table = std::fs::read_to_string(out.join("Myosin.csv")).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 4, "header + 3 particles");
    assert!(lines[0].starts_with("Avg_Obj_Size,Std_Obj_Size,File,Particle"));
    assert!(lines[1].starts_with("1,0,1,0,0,0,0,5,0,10,10,5,5"));
    assert!(lines[2].starts_with("2,0,1,1,10,10,0,1,0,1,1,1,"));
    assert!(lines[3].contains(",2,0,1,1,4,"));

    let summary_csv = std::fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
    assert!(summary_csv.starts_with("Condition,# of Files,Average Speed,Speed SEM,Total # of Objects"));
    assert!(summary_csv.lines().nth(1).unwrap().starts_with("Myosin,2,3.5,"));

    let full = std::fs::read_to_string(out.join("Myosin-Full Object Data.csv")).unwrap();
    assert_eq!(full.lines().count(), 1 + 6 + 2);

    assert!(out.join("Myosin01.svg").exists());
    assert!(out.join("Myosin02.svg").exists());
}

#[test]
fn test_linking_failure_is_skipped_with_diagnostic() {
    let dir = scratch_dir("skip");
    let good = dir.join("Actin1.csv");
    let bad = dir.join("Actin2.csv");
    write_csv(&good, &movie_two());
    std::fs::write(&bad, "frame,x,y\n0,1,1\n").unwrap();

    let condition = Condition::new("Actin", vec![bad, good]).unwrap();
    let pipeline = Pipeline::new(settings(&dir), PrelinkedTables::new()).unwrap();
    let report = pipeline.run(&[condition]).unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics_text().contains("Actin2.csv was skipped due to:"));
    assert_eq!(report.summaries[0].file_count, 2);
    assert_eq!(report.summaries[0].particle_count, 1);
}

#[test]
fn test_unreadable_file_aborts_run() {
    let dir = scratch_dir("missing");
    let condition = Condition::new("Ghost", vec![dir.join("nope.csv")]).unwrap();
    let pipeline = Pipeline::new(settings(&dir), PrelinkedTables::new()).unwrap();

    let err = pipeline.run(&[condition]).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_repeated_frame_aborts_run() {
    let dir = scratch_dir("frame_order");
    let path = dir.join("Dup1.csv");
    write_csv(
        &path,
        &[
            Observation::new(3, 7, 0.0, 0.0, 255.0),
            Observation::new(3, 7, 1.0, 1.0, 255.0),
        ],
    );

    let condition = Condition::new("Dup", vec![path]).unwrap();
    let pipeline = Pipeline::new(settings(&dir), PrelinkedTables::new()).unwrap();

    let err = pipeline.run(&[condition]).unwrap_err();
    assert!(matches!(err, Error::FrameOrder { particle: 3, .. }));
}

#[test]
fn test_multiple_conditions_in_order() {
    let dir = scratch_dir("two_conditions");
    let a = dir.join("A1.csv");
    let b = dir.join("B1.csv");
    write_csv(&a, &movie_one());
    write_csv(&b, &movie_two());

    let conditions = vec![
        Condition::new("A", vec![a]).unwrap(),
        Condition::new("B", vec![b]).unwrap(),
    ];
    let pipeline = Pipeline::new(settings(&dir), PrelinkedTables::new()).unwrap();
    let report = pipeline.run(&conditions).unwrap();

    let names: Vec<&str> = report
        .summaries
        .iter()
        .map(|s| s.condition.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(dir.join("out").join("A.csv").exists());
    assert!(dir.join("out").join("B.csv").exists());
}
