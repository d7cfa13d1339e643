//! Linked observation tables (Arrow/Parquet/CSV)
//!
//! **Append-Only Write Pattern**: an `ObservationTable` is built from whole
//! record batches and never updated row by row. Every batch must share the
//! schema of the first one.
//!
//! The canonical columns are `particle`, `frame`, `x`, `y` and `mass`. Integer
//! and float columns of any width are accepted and cast on read; extra columns
//! (e.g. `ecc`, `signal` from the tracker) are ignored.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Column holding the particle identity
pub const PARTICLE_COLUMN: &str = "particle";
/// Column holding the frame index
pub const FRAME_COLUMN: &str = "frame";
/// Column holding the x position in pixels
pub const X_COLUMN: &str = "x";
/// Column holding the y position in pixels
pub const Y_COLUMN: &str = "y";
/// Column holding the integrated brightness
pub const MASS_COLUMN: &str = "mass";

/// One detection of one particle in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Particle identity assigned by the linking stage
    pub particle: i64,
    /// Frame index
    pub frame: i64,
    /// x position in pixels
    pub x: f64,
    /// y position in pixels
    pub y: f64,
    /// Integrated brightness of the detection
    pub mass: f64,
}

impl Observation {
    /// Create a new observation.
    #[must_use]
    pub const fn new(particle: i64, frame: i64, x: f64, y: f64, mass: f64) -> Self {
        Self {
            particle,
            frame,
            x,
            y,
            mass,
        }
    }

    /// Euclidean distance to another observation, in pixels.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Arrow schema of a canonical observation batch.
#[must_use]
pub fn observation_schema() -> Schema {
    Schema::new(vec![
        Field::new(PARTICLE_COLUMN, DataType::Int64, false),
        Field::new(FRAME_COLUMN, DataType::Int64, false),
        Field::new(X_COLUMN, DataType::Float64, true),
        Field::new(Y_COLUMN, DataType::Float64, true),
        Field::new(MASS_COLUMN, DataType::Float64, true),
    ])
}

/// Build a canonical record batch from observations.
///
/// # Errors
///
/// Returns error if Arrow rejects the batch (never for well-formed input).
pub fn observations_to_batch(observations: &[Observation]) -> Result<RecordBatch> {
    let particle = Int64Array::from_iter_values(observations.iter().map(|o| o.particle));
    let frame = Int64Array::from_iter_values(observations.iter().map(|o| o.frame));
    let x = Float64Array::from_iter_values(observations.iter().map(|o| o.x));
    let y = Float64Array::from_iter_values(observations.iter().map(|o| o.y));
    let mass = Float64Array::from_iter_values(observations.iter().map(|o| o.mass));

    Ok(RecordBatch::try_new(
        Arc::new(observation_schema()),
        vec![
            Arc::new(particle),
            Arc::new(frame),
            Arc::new(x),
            Arc::new(y),
            Arc::new(mass),
        ],
    )?)
}

/// Linked observations of one input file
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    batches: Vec<RecordBatch>,
}

impl ObservationTable {
    /// Create a table from existing batches
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }

    /// Create a table from in-memory observations
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn from_observations(observations: &[Observation]) -> Result<Self> {
        Ok(Self::new(vec![observations_to_batch(observations)?]))
    }

    /// Read a tracker's Parquet output, one batch per row group chunk
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be opened and `StorageError` if it is not
    /// a readable Parquet table
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = std::fs::File::open(path.as_ref())?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .and_then(ParquetRecordBatchReaderBuilder::build)
            .map_err(|e| Error::StorageError(format!("Not a Parquet table: {e}")))?;

        let mut table = Self::default();
        for batch in reader {
            let batch =
                batch.map_err(|e| Error::StorageError(format!("Unreadable row group: {e}")))?;
            table.append_batch(batch)?;
        }
        Ok(table)
    }

    /// Load table from a CSV file with a header row
    ///
    /// Only the canonical columns are read; their position in the file does
    /// not matter. An unnamed leading index column (as written by dataframe
    /// libraries) is ignored like any other extra column.
    ///
    /// # Errors
    /// Returns error if file cannot be opened (`Io`), a canonical column is
    /// missing or a value does not parse (`StorageError`)
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut reader = csv::Reader::from_reader(file);

        let headers = reader.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| Error::StorageError(format!("Missing column '{name}'")))
        };
        let particle_idx = position(PARTICLE_COLUMN)?;
        let frame_idx = position(FRAME_COLUMN)?;
        let x_idx = position(X_COLUMN)?;
        let y_idx = position(Y_COLUMN)?;
        let mass_idx = position(MASS_COLUMN)?;

        let mut observations = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("").trim();
            let int = |idx: usize| -> Result<i64> {
                let raw = field(idx);
                if let Ok(value) = raw.parse::<i64>() {
                    return Ok(value);
                }
                // Trackers sometimes emit integral columns as floats ("3.0")
                raw.parse::<f64>()
                    .ok()
                    .and_then(float_to_index)
                    .ok_or_else(|| {
                        Error::StorageError(format!("Row {}: bad integer '{raw}'", line + 1))
                    })
            };
            let float = |idx: usize| -> Result<f64> {
                let raw = field(idx);
                if raw.is_empty() {
                    return Ok(f64::NAN);
                }
                raw.parse::<f64>().map_err(|e| {
                    Error::StorageError(format!("Row {}: bad number '{raw}': {e}", line + 1))
                })
            };

            observations.push(Observation::new(
                int(particle_idx)?,
                int(frame_idx)?,
                float(x_idx)?,
                float(y_idx)?,
                float(mass_idx)?,
            ));
        }

        Self::from_observations(&observations)
    }

    /// Total number of rows across batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Add a batch to the end of the table
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if `batch` does not share the first batch's schema
    pub fn append_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if let Some(first) = self.batches.first() {
            if batch.schema() != first.schema() {
                return Err(Error::StorageError(format!(
                    "Batch schema {:?} differs from table schema {:?}",
                    batch.schema(),
                    first.schema()
                )));
            }
        }
        self.batches.push(batch);
        Ok(())
    }

    /// Materialize every row as an [`Observation`], in table order
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if a canonical column is missing, cannot be cast
    /// to its canonical type, or holds a null particle/frame
    pub fn observations(&self) -> Result<Vec<Observation>> {
        let mut observations = Vec::with_capacity(self.num_rows());

        for batch in &self.batches {
            let particle = int_column(batch, PARTICLE_COLUMN)?;
            let frame = int_column(batch, FRAME_COLUMN)?;
            let x = float_column(batch, X_COLUMN)?;
            let y = float_column(batch, Y_COLUMN)?;
            let mass = float_column(batch, MASS_COLUMN)?;

            for row in 0..batch.num_rows() {
                if particle.is_null(row) || frame.is_null(row) {
                    return Err(Error::StorageError(format!(
                        "Row {row}: particle and frame must not be null"
                    )));
                }
                observations.push(Observation::new(
                    particle.value(row),
                    frame.value(row),
                    float_value(&x, row),
                    float_value(&y, row),
                    float_value(&mass, row),
                ));
            }
        }

        Ok(observations)
    }
}

/// Integral, in-range float as an id; `None` for NaN, infinities, fractions
/// and values outside `i64`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn float_to_index(value: f64) -> Option<i64> {
    // 2^63, the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (value.is_finite() && value.trunc() == value && (-LIMIT..LIMIT).contains(&value))
        .then(|| value as i64)
}

fn float_value(array: &Float64Array, row: usize) -> f64 {
    if array.is_null(row) {
        f64::NAN
    } else {
        array.value(row)
    }
}

fn column_as(batch: &RecordBatch, name: &str, data_type: &DataType) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::StorageError(format!("Missing column '{name}'")))?;
    cast(column, data_type)
        .map_err(|e| Error::StorageError(format!("Column '{name}' is not numeric: {e}")))
}

fn int_column(batch: &RecordBatch, name: &str) -> Result<Int64Array> {
    // Float-typed id columns must hold integral values
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::StorageError(format!("Missing column '{name}'")))?;
    if matches!(column.data_type(), DataType::Float32 | DataType::Float64) {
        let floats = column_as(batch, name, &DataType::Float64)?;
        let floats = downcast_f64(&floats, name)?;
        return floats
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .map(|v| {
                        float_to_index(v).ok_or_else(|| {
                            Error::StorageError(format!(
                                "Row {row}: column '{name}' holds non-integer id {v}"
                            ))
                        })
                    })
                    .transpose()
            })
            .collect();
    }

    let array = column_as(batch, name, &DataType::Int64)?;
    array
        .as_any()
        .downcast_ref::<Int64Array>()
        .cloned()
        .ok_or_else(|| Error::StorageError(format!("Column '{name}' is not an integer column")))
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = column_as(batch, name, &DataType::Float64)?;
    downcast_f64(&array, name)
}

fn downcast_f64(array: &ArrayRef, name: &str) -> Result<Float64Array> {
    array
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| Error::StorageError(format!("Column '{name}' is not a float column")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, Int32Array};

    fn narrow_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("frame", DataType::Int32, false),
            Field::new("particle", DataType::Int32, false),
            Field::new("x", DataType::Float32, false),
            Field::new("y", DataType::Float32, false),
            Field::new("mass", DataType::Float32, false),
            Field::new("ecc", DataType::Float32, false),
        ]);

        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int32Array::from(vec![0, 1])),
                Arc::new(Int32Array::from(vec![7, 7])),
                Arc::new(Float32Array::from(vec![1.5, 2.5])),
                Arc::new(Float32Array::from(vec![0.0, 1.0])),
                Arc::new(Float32Array::from(vec![255.0, 510.0])),
                Arc::new(Float32Array::from(vec![0.1, 0.2])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_observations_cast_narrow_columns() {
        let table = ObservationTable::new(vec![narrow_batch()]);
        let observations = table.observations().unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0], Observation::new(7, 0, 1.5, 0.0, 255.0));
        assert_eq!(observations[1].frame, 1);
    }

    #[test]
    fn test_missing_column_is_storage_error() {
        let schema = Schema::new(vec![Field::new("particle", DataType::Int64, false)]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(Int64Array::from(vec![1]))],
        )
        .unwrap();

        let err = ObservationTable::new(vec![batch]).observations().unwrap_err();
        assert!(matches!(err, Error::StorageError(ref m) if m.contains("frame")));
    }

    #[test]
    fn test_append_batch_schema_validation() {
        let mut table = ObservationTable::default();
        let batch = observations_to_batch(&[Observation::new(0, 0, 0.0, 0.0, 1.0)]).unwrap();
        table.append_batch(batch.clone()).unwrap();
        table.append_batch(batch).unwrap();
        assert_eq!(table.num_rows(), 2);

        let result = table.append_batch(narrow_batch());
        assert!(result.is_err());
    }

    fn float_id_batch(particle: f64, frame: f64) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("particle", DataType::Float64, false),
            Field::new("frame", DataType::Float64, false),
            Field::new("x", DataType::Float64, false),
            Field::new("y", DataType::Float64, false),
            Field::new("mass", DataType::Float64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(vec![particle])),
                Arc::new(Float64Array::from(vec![frame])),
                Arc::new(Float64Array::from(vec![1.0])),
                Arc::new(Float64Array::from(vec![1.0])),
                Arc::new(Float64Array::from(vec![1.0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_non_integral_float_ids_rejected() {
        for (particle, frame) in [(f64::NAN, 0.0), (2.6, 0.0), (2.0, 1.4), (1e30, 0.0)] {
            let err = ObservationTable::new(vec![float_id_batch(particle, frame)])
                .observations()
                .unwrap_err();
            assert!(matches!(err, Error::StorageError(ref m) if m.contains("non-integer id")));
        }
    }

    #[test]
    fn test_float_to_index_bounds() {
        assert_eq!(float_to_index(-3.0), Some(-3));
        assert_eq!(float_to_index(f64::INFINITY), None);
        assert_eq!(float_to_index(9_223_372_036_854_775_808.0), None);
        assert_eq!(float_to_index(-9_223_372_036_854_775_808.0), Some(i64::MIN));
    }

    #[test]
    fn test_integral_float_ids_accepted() {
        let batch = float_id_batch(2.0, 4.0);

        let observations = ObservationTable::new(vec![batch]).observations().unwrap();
        assert_eq!(observations[0].particle, 2);
        assert_eq!(observations[0].frame, 4);
    }

    #[test]
    fn test_distance_to() {
        let a = Observation::new(0, 0, 0.0, 0.0, 0.0);
        let b = Observation::new(0, 1, 3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
