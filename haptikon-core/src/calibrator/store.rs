//! Calibration record persistence
//!
//! Loads and saves the touch calibration record through the blob store.
//! A missing or corrupt record is never fatal: the pipeline simply runs
//! uncalibrated until the interactive procedure produces a new one.

use haptikon_hal::storage::{BlobStorage, StorageError, StorageKey};

use crate::config::CalibrationData;

/// Maximum serialized calibration size
const MAX_CALIBRATION_SIZE: usize = 64;

/// Calibration persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Blob store operation failed
    Storage(StorageError),
    /// Deserialization failed
    Deserialize,
    /// Serialization failed
    Serialize,
    /// CRC check failed
    CrcMismatch,
    /// Invalid magic or version
    InvalidFormat,
}

impl From<StorageError> for CalibrationError {
    fn from(e: StorageError) -> Self {
        CalibrationError::Storage(e)
    }
}

/// Load the calibration record from the blob store
///
/// Returns the stored record, or a fresh uncalibrated record if nothing
/// is stored or the stored bytes fail validation.
pub fn load_calibration<B: BlobStorage>(store: &mut B) -> CalibrationData {
    match load_calibration_inner(store) {
        Ok(data) => data,
        Err(_) => CalibrationData::new(),
    }
}

/// Inner function that returns errors
fn load_calibration_inner<B: BlobStorage>(
    store: &mut B,
) -> Result<CalibrationData, CalibrationError> {
    let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
    let len = store.read(StorageKey::TouchCalibration, &mut buffer)?;

    let data: CalibrationData =
        postcard::from_bytes(&buffer[..len]).map_err(|_| CalibrationError::Deserialize)?;

    // Validate magic and version
    if !data.is_valid() {
        return Err(CalibrationError::InvalidFormat);
    }

    // Verify CRC
    if !data.verify_crc() {
        return Err(CalibrationError::CrcMismatch);
    }

    Ok(data)
}

/// Save the calibration record to the blob store
///
/// Updates the CRC before saving.
pub fn save_calibration<B: BlobStorage>(
    store: &mut B,
    data: &mut CalibrationData,
) -> Result<(), CalibrationError> {
    data.update_crc();

    let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
    let bytes =
        postcard::to_slice(data, &mut buffer).map_err(|_| CalibrationError::Serialize)?;

    store
        .write(StorageKey::TouchCalibration, bytes)
        .map_err(CalibrationError::Storage)?;

    Ok(())
}
