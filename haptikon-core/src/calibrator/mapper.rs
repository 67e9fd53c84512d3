//! Raw-to-screen coordinate mapping

use crate::config::{CalibrationData, TouchConfig};

/// Maps averaged raw panel coordinates to screen pixels
///
/// Uses the stored two-point affine transform when calibrated, or a
/// linear default across the configured raw range otherwise. Results are
/// always clamped to the display bounds.
#[derive(Debug, Clone)]
pub struct Calibrator {
    data: CalibrationData,
    screen_width: u16,
    screen_height: u16,
    raw_default_min: u16,
    raw_default_max: u16,
}

impl Calibrator {
    /// Create a calibrator with a previously loaded record
    pub fn new(config: &TouchConfig, data: CalibrationData) -> Self {
        Self {
            data,
            screen_width: config.screen_width,
            screen_height: config.screen_height,
            raw_default_min: config.raw_default_min,
            raw_default_max: config.raw_default_max,
        }
    }

    /// The active calibration record
    pub fn data(&self) -> &CalibrationData {
        &self.data
    }

    /// Replace the active calibration record
    pub fn set_data(&mut self, data: CalibrationData) {
        self.data = data;
    }

    /// Whether the affine transform is active
    pub fn is_calibrated(&self) -> bool {
        self.data.calibrated
    }

    /// Derive and activate a transform from two corner readings
    ///
    /// Returns false (record untouched) when the geometry is degenerate.
    pub fn apply_corners(&mut self, x_min: u16, x_max: u16, y_min: u16, y_max: u16) -> bool {
        match CalibrationData::from_corners(
            x_min,
            x_max,
            y_min,
            y_max,
            self.screen_width,
            self.screen_height,
        ) {
            Some(data) => {
                self.data = data;
                true
            }
            None => false,
        }
    }

    /// Map raw panel counts to a clamped screen position
    pub fn map_to_screen(&self, raw_x: u16, raw_y: u16) -> (i16, i16) {
        if self.data.calibrated {
            (
                affine(
                    raw_x,
                    self.data.x_min,
                    self.data.scale_x_q16,
                    self.data.offset_x,
                    self.screen_width,
                ),
                affine(
                    raw_y,
                    self.data.y_min,
                    self.data.scale_y_q16,
                    self.data.offset_y,
                    self.screen_height,
                ),
            )
        } else {
            (
                linear(
                    raw_x,
                    self.raw_default_min,
                    self.raw_default_max,
                    self.screen_width,
                ),
                linear(
                    raw_y,
                    self.raw_default_min,
                    self.raw_default_max,
                    self.screen_height,
                ),
            )
        }
    }
}

/// Affine map: `(raw - min) * scale + offset`, clamped to the extent
fn affine(raw: u16, min: u16, scale_q16: i32, offset: i16, extent: u16) -> i16 {
    let scaled = ((raw as i64 - min as i64) * scale_q16 as i64) >> 16;
    clamp_to(scaled + offset as i64, extent)
}

/// Linear interpolation across the default raw range, clamped
fn linear(raw: u16, raw_min: u16, raw_max: u16, extent: u16) -> i16 {
    let span = raw_max.saturating_sub(raw_min);
    if span == 0 {
        return 0;
    }
    let pos = raw.saturating_sub(raw_min).min(span);
    clamp_to(pos as i64 * extent as i64 / span as i64, extent)
}

fn clamp_to(value: i64, extent: u16) -> i16 {
    value.clamp(0, extent as i64 - 1) as i16
}
