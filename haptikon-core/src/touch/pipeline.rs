//! Touch pipeline executor
//!
//! Ties the sampler, debounce filter, calibrator and gesture classifier
//! into the single per-tick dataflow, and owns the interactive
//! calibration procedure. One pipeline instance per panel; everything it
//! needs is injected, nothing is process-global.

use haptikon_hal::clock::Clock;
use haptikon_hal::storage::BlobStorage;
use haptikon_hal::touch::TouchSense;

use super::point::TouchPoint;
use crate::calibrator::{load_calibration, save_calibration, Calibrator};
use crate::config::{CalibrationData, TouchConfig};
use crate::filter::DebounceFilter;
use crate::gesture::{Gesture, GestureClassifier};
use crate::sampler::Sampler;

/// Calibration target corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Corner {
    /// Nominal screen (0, 0)
    TopLeft,
    /// Nominal screen (width-1, height-1)
    BottomRight,
}

/// Raw readings captured so far during a calibration round
#[derive(Debug, Clone, Copy, Default)]
struct CornerCapture {
    top_left: Option<(u16, u16)>,
    bottom_right: Option<(u16, u16)>,
}

/// Touch interpretation pipeline
///
/// Call [`tick`](Self::tick) at a fixed cadence (nominally 100 Hz) and
/// poll [`current_touch`](Self::current_touch) and the gesture accessors
/// between ticks. The calibration entry points are a separate, rare
/// administrative mode and are the only calls that block.
pub struct TouchPipeline<S, C, B> {
    sensor: S,
    clock: C,
    store: B,
    sampler: Sampler,
    filter: DebounceFilter,
    calibrator: Calibrator,
    classifier: GestureClassifier,
    point: TouchPoint,
    capture: CornerCapture,
    calibration_timeout_ms: u32,
}

impl<S, C, B> TouchPipeline<S, C, B>
where
    S: TouchSense,
    C: Clock,
    B: BlobStorage,
{
    /// Build a pipeline and load any persisted calibration
    ///
    /// A missing or corrupt stored record leaves the pipeline running
    /// with the uncalibrated default mapping.
    pub fn new(config: &TouchConfig, sensor: S, clock: C, mut store: B) -> Self {
        let data = load_calibration(&mut store);
        Self {
            sensor,
            clock,
            store,
            sampler: Sampler::new(config),
            filter: DebounceFilter::new(config.debounce_ms),
            calibrator: Calibrator::new(config, data),
            classifier: GestureClassifier::new(config),
            point: TouchPoint::new(),
            capture: CornerCapture::default(),
            calibration_timeout_ms: config.calibration_timeout_ms,
        }
    }

    /// Advance the pipeline by one sample cycle
    ///
    /// Never blocks and completes in bounded time. The published snapshot
    /// is replaced wholesale, so reads between ticks are consistent.
    pub fn tick(&mut self) {
        let now_ms = self.clock.now_ms();
        let reading = self.sampler.sample_tick(&mut self.sensor, now_ms);

        let was_pressed = self.point.pressed;
        let pressed = self.filter.apply(was_pressed, reading.pressed, now_ms);

        // An idle or rejected tick carries no usable coordinates; the
        // snapshot keeps the last accepted raw position.
        let (raw_x, raw_y) = if reading.pressed {
            (reading.raw_x, reading.raw_y)
        } else {
            (self.point.raw_x, self.point.raw_y)
        };
        let pressure = if reading.pressed {
            reading.raw_z
        } else if pressed {
            // Release chatter reverted: still counts as held
            self.point.pressure
        } else {
            0
        };

        let (x, y) = self.calibrator.map_to_screen(raw_x, raw_y);
        self.point = TouchPoint {
            raw_x,
            raw_y,
            x,
            y,
            pressure,
            pressed,
            was_pressed,
            timestamp_ms: now_ms,
        };

        self.classifier.update(&self.point);
    }

    /// The published snapshot of the current touch state
    pub fn current_touch(&self) -> TouchPoint {
        self.point
    }

    /// Whether a classified gesture is waiting to be consumed
    pub fn has_pending_gesture(&self) -> bool {
        self.classifier.has_pending()
    }

    /// Copy of the pending (or live) gesture record
    pub fn peek_gesture(&self) -> Gesture {
        self.classifier.peek()
    }

    /// Consume the pending gesture (idempotent)
    pub fn clear_gesture(&mut self) {
        self.classifier.clear();
    }

    /// Whether the affine calibration is active
    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_calibrated()
    }

    /// Start an interactive calibration round
    ///
    /// Clears any previously captured corners. Steady-state debounce and
    /// gesture history is reset so the corner presses are not judged
    /// against earlier interaction.
    pub fn begin_calibration(&mut self) {
        self.capture = CornerCapture::default();
        self.filter.reset();
        self.classifier.reset();
    }

    /// Block until a fresh press is observed and record it for `corner`
    ///
    /// Busy-polls the sampler. A finger already resting on the panel must
    /// lift before its next press counts, so one touch cannot serve two
    /// corners. Returns false on timeout, leaving any previously captured
    /// corner intact.
    pub fn sample_calibration_corner(&mut self, corner: Corner) -> bool {
        let started_ms = self.clock.now_ms();
        let mut was_pressed = true;

        loop {
            if self.clock.elapsed_since(started_ms) >= self.calibration_timeout_ms {
                return false;
            }

            let now_ms = self.clock.now_ms();
            let reading = self.sampler.sample_tick(&mut self.sensor, now_ms);
            if reading.pressed && !was_pressed {
                let raw = (reading.raw_x, reading.raw_y);
                match corner {
                    Corner::TopLeft => self.capture.top_left = Some(raw),
                    Corner::BottomRight => self.capture.bottom_right = Some(raw),
                }
                self.drain_release(started_ms);
                return true;
            }
            was_pressed = reading.pressed;
        }
    }

    /// Derive, persist and activate the transform from the captured corners
    ///
    /// Fails when a corner is missing or the captured geometry is
    /// degenerate; the prior calibration is left untouched in both cases.
    /// If the record cannot be persisted the freshly derived transform
    /// stays active in memory but the call still reports false.
    pub fn finish_calibration(&mut self) -> bool {
        let ((x_min, y_min), (x_max, y_max)) =
            match (self.capture.top_left, self.capture.bottom_right) {
                (Some(top_left), Some(bottom_right)) => (top_left, bottom_right),
                _ => return false,
            };

        if !self.calibrator.apply_corners(x_min, x_max, y_min, y_max) {
            return false;
        }
        self.capture = CornerCapture::default();

        let mut data = *self.calibrator.data();
        save_calibration(&mut self.store, &mut data).is_ok()
    }

    /// Drop back to the uncalibrated default mapping and persist the reset
    pub fn reset_calibration(&mut self) {
        self.capture = CornerCapture::default();
        self.calibrator.set_data(CalibrationData::new());

        let mut data = CalibrationData::new();
        let _ = save_calibration(&mut self.store, &mut data);
    }

    /// Wait (bounded by the same deadline) for lift-off after a corner press
    fn drain_release(&mut self, started_ms: u32) {
        loop {
            if self.clock.elapsed_since(started_ms) >= self.calibration_timeout_ms {
                return;
            }
            let now_ms = self.clock.now_ms();
            if !self.sampler.sample_tick(&mut self.sensor, now_ms).pressed {
                return;
            }
        }
    }
}
