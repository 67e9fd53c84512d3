//! Burst sampling with majority-valid averaging

use heapless::Vec;

use haptikon_hal::touch::TouchSense;

use super::sample::TouchSample;
use crate::config::TouchConfig;

/// Upper bound on reads per tick (sizes the sample buffer)
pub const MAX_SAMPLES_PER_TICK: usize = 8;

/// Burst sampler
///
/// Takes a fixed number of raw reads per tick and consolidates them into
/// one averaged reading, or an idle reading when too few reads saw contact.
#[derive(Debug, Clone)]
pub struct Sampler {
    samples_per_tick: u8,
    pressure_threshold: u16,
}

impl Sampler {
    /// Create a sampler from the pipeline configuration
    pub fn new(config: &TouchConfig) -> Self {
        Self {
            samples_per_tick: config.samples_per_tick.clamp(1, MAX_SAMPLES_PER_TICK as u8),
            pressure_threshold: config.pressure_threshold,
        }
    }

    /// Perform one tick's worth of raw reads and average the valid ones
    ///
    /// A read is valid when its pressure exceeds the threshold. If at least
    /// half the burst is valid, the valid reads' X, Y and pressure are
    /// separately averaged and the tick reports a touch; otherwise the tick
    /// is idle (`pressed = false`, zero pressure). An idle tick is the
    /// expected no-contact state, not an error.
    pub fn sample_tick<S: TouchSense>(&self, sensor: &mut S, now_ms: u32) -> TouchSample {
        let mut burst: Vec<TouchSample, MAX_SAMPLES_PER_TICK> = Vec::new();

        for _ in 0..self.samples_per_tick {
            let raw_x = sensor.read_raw_x();
            let raw_y = sensor.read_raw_y();
            let raw_z = sensor.read_raw_z();
            let _ = burst.push(TouchSample {
                raw_x,
                raw_y,
                raw_z,
                pressed: raw_z > self.pressure_threshold,
                timestamp_ms: now_ms,
            });
        }

        let valid = burst.iter().filter(|s| s.pressed).count();
        if valid * 2 < burst.len() {
            return TouchSample::idle(now_ms);
        }

        let mut sum_x: u32 = 0;
        let mut sum_y: u32 = 0;
        let mut sum_z: u32 = 0;
        for sample in burst.iter().filter(|s| s.pressed) {
            sum_x += sample.raw_x as u32;
            sum_y += sample.raw_y as u32;
            sum_z += sample.raw_z as u32;
        }

        TouchSample {
            raw_x: (sum_x / valid as u32) as u16,
            raw_y: (sum_y / valid as u32) as u16,
            raw_z: (sum_z / valid as u32) as u16,
            pressed: true,
            timestamp_ms: now_ms,
        }
    }
}
