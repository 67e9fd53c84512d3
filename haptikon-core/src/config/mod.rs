//! Configuration type definitions

pub mod calibration;
pub mod types;

pub use calibration::{CalibrationData, CALIBRATION_MAGIC, CALIBRATION_VERSION};
pub use types::TouchConfig;
