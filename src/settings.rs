//! Tracking settings
//!
//! Caller-supplied parameters for one run. The detection and linking
//! parameters (`object_area`, `search_range`, `trk_memory`) are passed through
//! to the [`Linker`](crate::linking::Linker); the rest drive reduction and
//! export.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default brightness normalization for the `mass` column (8-bit pixels).
pub const DEFAULT_BRIGHTNESS_SCALE: f64 = 255.0;

/// Settings for a tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Detection size filter (odd pixel diameter)
    pub object_area: u32,
    /// Maximum per-frame displacement for linking, in pixels
    pub search_range: f64,
    /// Frames a particle may vanish for before its track ends
    pub trk_memory: u32,
    /// Nominal frame rate
    pub fps: f64,
    /// Physical size of one pixel
    pub pixel_size: f64,
    /// Emit a trajectory image per file
    pub paths: bool,
    /// Emit the unreduced per-frame table per condition
    pub full_obj_data: bool,
    /// Divisor applied to `mass` before size statistics
    pub brightness_scale: f64,
    /// Directory all outputs are written into
    pub output_dir: PathBuf,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            object_area: 11,
            search_range: 5.0,
            trk_memory: 3,
            fps: 1.0,
            pixel_size: 1.0,
            paths: false,
            full_obj_data: false,
            brightness_scale: DEFAULT_BRIGHTNESS_SCALE,
            output_dir: PathBuf::from("."),
        }
    }
}

impl TrackingSettings {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> TrackingSettingsBuilder {
        TrackingSettingsBuilder::default()
    }

    /// Load settings from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not valid JSON, or holds
    /// invalid values (see [`validate`](Self::validate)).
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Seconds between two nominal frames.
    #[must_use]
    pub fn seconds_per_frame(&self) -> f64 {
        self.fps.recip()
    }

    /// Check the numeric parameters the reducer divides by.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `fps`, `pixel_size` or
    /// `brightness_scale` is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fps", self.fps),
            ("pixel_size", self.pixel_size),
            ("brightness_scale", self.brightness_scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidInput(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for `TrackingSettings`.
#[derive(Debug, Default)]
pub struct TrackingSettingsBuilder {
    settings: TrackingSettings,
}

impl TrackingSettingsBuilder {
    /// Set the detection size filter.
    #[must_use]
    pub const fn object_area(mut self, object_area: u32) -> Self {
        self.settings.object_area = object_area;
        self
    }

    /// Set the linking search range.
    #[must_use]
    pub const fn search_range(mut self, search_range: f64) -> Self {
        self.settings.search_range = search_range;
        self
    }

    /// Set the linking memory in frames.
    #[must_use]
    pub const fn trk_memory(mut self, trk_memory: u32) -> Self {
        self.settings.trk_memory = trk_memory;
        self
    }

    /// Set the nominal frame rate.
    #[must_use]
    pub const fn fps(mut self, fps: f64) -> Self {
        self.settings.fps = fps;
        self
    }

    /// Set the physical pixel size.
    #[must_use]
    pub const fn pixel_size(mut self, pixel_size: f64) -> Self {
        self.settings.pixel_size = pixel_size;
        self
    }

    /// Emit trajectory images.
    #[must_use]
    pub const fn paths(mut self, paths: bool) -> Self {
        self.settings.paths = paths;
        self
    }

    /// Emit the unreduced per-frame table.
    #[must_use]
    pub const fn full_obj_data(mut self, full_obj_data: bool) -> Self {
        self.settings.full_obj_data = full_obj_data;
        self
    }

    /// Set the mass normalization constant.
    #[must_use]
    pub const fn brightness_scale(mut self, brightness_scale: f64) -> Self {
        self.settings.brightness_scale = brightness_scale;
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.settings.output_dir = output_dir.into();
        self
    }

    /// Build and validate the settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a numeric parameter is out of range.
    pub fn build(self) -> Result<TrackingSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let settings = TrackingSettings::builder()
            .fps(5.0)
            .pixel_size(0.16)
            .paths(true)
            .build()
            .unwrap();

        assert!((settings.fps - 5.0).abs() < f64::EPSILON);
        assert!((settings.seconds_per_frame() - 0.2).abs() < 1e-12);
        assert!(settings.paths);
        assert!(!settings.full_obj_data);
    }

    #[test]
    fn test_builder_rejects_zero_fps() {
        let err = TrackingSettings::builder().fps(0.0).build().unwrap_err();
        assert!(err.to_string().contains("fps"));
    }

    #[test]
    fn test_builder_rejects_negative_pixel_size() {
        let err = TrackingSettings::builder()
            .pixel_size(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: TrackingSettings =
            serde_json::from_str(r#"{"fps": 10.0, "full_obj_data": true}"#).unwrap();
        assert!((settings.fps - 10.0).abs() < f64::EPSILON);
        assert!(settings.full_obj_data);
        assert!((settings.brightness_scale - DEFAULT_BRIGHTNESS_SCALE).abs() < f64::EPSILON);
    }
}
