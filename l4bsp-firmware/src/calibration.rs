//! Touch calibration persistence
//!
//! Loads and saves the touchscreen calibration record to flash storage.

use defmt::*;

use l4bsp_core::config::{CalibrationError, TouchCalibration, MAX_CALIBRATION_SIZE};
use l4bsp_hal::flash::{FlashError, FlashStorage, StorageKey};

/// Calibration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Flash operation failed
    Flash(FlashError),
    /// Record could not be encoded or failed validation
    Record(CalibrationError),
}

impl From<FlashError> for PersistError {
    fn from(e: FlashError) -> Self {
        PersistError::Flash(e)
    }
}

impl From<CalibrationError> for PersistError {
    fn from(e: CalibrationError) -> Self {
        PersistError::Record(e)
    }
}

/// Load the touch calibration from flash
///
/// Returns `None` when nothing is stored or the record is invalid; the
/// touchscreen then reports raw controller coordinates.
pub async fn load_calibration(storage: &mut impl FlashStorage) -> Option<TouchCalibration> {
    match load_calibration_inner(storage).await {
        Ok(cal) => {
            info!(
                "Loaded touch calibration: x {}..{}, y {}..{}",
                cal.x.raw_min, cal.x.raw_max, cal.y.raw_min, cal.y.raw_max
            );
            Some(cal)
        }
        Err(PersistError::Flash(FlashError::NotFound)) => {
            debug!("No touch calibration in flash");
            None
        }
        Err(e) => {
            warn!("Failed to load touch calibration: {:?}", e);
            None
        }
    }
}

async fn load_calibration_inner(
    storage: &mut impl FlashStorage,
) -> Result<TouchCalibration, PersistError> {
    let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
    let len = storage.read(StorageKey::TouchCalibration, &mut buffer).await?;
    Ok(TouchCalibration::decode(&buffer[..len])?)
}

/// Save the touch calibration to flash
pub async fn save_calibration(
    storage: &mut impl FlashStorage,
    calibration: &TouchCalibration,
) -> Result<(), PersistError> {
    let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
    let bytes = calibration.encode(&mut buffer)?;
    storage.write(StorageKey::TouchCalibration, bytes).await?;
    info!("Saved touch calibration ({} bytes)", bytes.len());
    Ok(())
}
