//! Device layer: the backend trait, the session context and the backends.

/// Retrying, statistics-keeping session around a backend.
pub mod session;

/// Software model of a GPU buffer manager and blitter.
pub mod sim;

/// Backend interface.
pub mod traits;

pub use session::Session;
pub use sim::{SimDevice, SimFault};
pub use traits::GemDevice;

use crate::common::DeviceError;
use crate::config::DeviceConfig;
use tracing::info;

/// Opens the backend named in the configuration.
///
/// # Returns
///
/// `DeviceError::NoDevice` if the backend name is not known.
pub fn open(config: &DeviceConfig) -> Result<Box<dyn GemDevice>, DeviceError> {
    let device: Box<dyn GemDevice> = match config.backend.as_str() {
        "sim" => Box::new(SimDevice::from_config(config)),
        other => {
            return Err(DeviceError::NoDevice(format!(
                "unknown backend '{}'",
                other
            )))
        }
    };
    info!(
        backend = device.name(),
        fault = ?config.fault,
        interrupt_every = config.interrupt_every,
        "device opened"
    );
    Ok(device)
}
