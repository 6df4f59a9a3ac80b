//! Device pairing
//!
//! Pairing goes through a transport seam so a real radio stack can be
//! plugged in later. When the transport reports itself unavailable, pairing
//! falls back to a simulated wearable so the rest of the pipeline still
//! runs end to end.

use crate::error::PairingError;
use log::{info, warn};
use std::thread;
use std::time::Duration;

/// Name reported by the simulated wearable
pub const SIMULATED_DEVICE_NAME: &str = "Simulated HealthBand X1";

/// Delay before the simulated wearable reports itself paired
pub const SIMULATED_PAIRING_DELAY: Duration = Duration::from_millis(1500);

/// Transport seam for discovering and pairing a wearable
pub trait PairingTransport: Send {
    /// Scan for a device and return its name once paired
    fn request_device(&self) -> Result<String, PairingError>;
}

/// Transport that simulates a wearable pairing handshake
pub struct SimulatedDevice {
    delay: Duration,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            delay: SIMULATED_PAIRING_DELAY,
        }
    }
}

impl SimulatedDevice {
    /// Create a simulated device with a custom handshake delay
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl PairingTransport for SimulatedDevice {
    fn request_device(&self) -> Result<String, PairingError> {
        thread::sleep(self.delay);
        Ok(SIMULATED_DEVICE_NAME.to_string())
    }
}

/// Pairing flow with a simulated fallback
///
/// An unavailable transport degrades to the simulated wearable; an explicit
/// cancellation does not.
pub struct DevicePairing {
    transport: Box<dyn PairingTransport>,
    fallback: SimulatedDevice,
}

impl Default for DevicePairing {
    fn default() -> Self {
        Self::new(Box::new(SimulatedDevice::default()))
    }
}

impl DevicePairing {
    pub fn new(transport: Box<dyn PairingTransport>) -> Self {
        Self {
            transport,
            fallback: SimulatedDevice::default(),
        }
    }

    #[cfg(test)]
    fn with_fallback(transport: Box<dyn PairingTransport>, fallback: SimulatedDevice) -> Self {
        Self {
            transport,
            fallback,
        }
    }

    /// Pair with a wearable and return its name
    pub fn pair(&self) -> Result<String, PairingError> {
        match self.transport.request_device() {
            Ok(name) => {
                info!("Paired with device '{}'", name);
                Ok(name)
            }
            Err(PairingError::Unavailable(reason)) => {
                warn!(
                    "Pairing transport unavailable ({}), falling back to simulated device",
                    reason
                );
                let name = self.fallback.request_device()?;
                info!("Paired with device '{}'", name);
                Ok(name)
            }
            Err(e) => Err(e),
        }
    }
}
