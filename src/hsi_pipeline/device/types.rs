//! Device property records

use std::fmt;
use std::num::NonZeroU32;

/// Identifier of one open device session. A null handle cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(NonZeroU32);

impl DeviceHandle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0.get())
    }
}

/// Sensor capabilities reported by the device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemProperties {
    pub model: String,
    pub serial_number: String,
    /// Largest supported cube width in pixels
    pub max_width: usize,
    /// Largest supported cube height (scan lines)
    pub max_height: usize,
    /// Bands delivered by the sensor before spectral correction
    pub raw_bands: usize,
    pub bits_per_sample: u32,
    pub min_wavelength_nm: f32,
    pub max_wavelength_nm: f32,
    pub max_integration_time_ms: f64,
}

/// Spatial resolution of the cubes the device will produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigurationParameters {
    pub cube_width: usize,
    pub cube_height: usize,
}

/// Acquisition timing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RuntimeParameters {
    /// Exposure per scan line in milliseconds
    pub integration_time_ms: f64,
}

/// Lifecycle of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    Closed,
    Opened,
    Configured,
    Initialized,
    Started,
    Stopped,
}
