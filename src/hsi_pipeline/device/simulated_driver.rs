//! Deterministic in-process camera.
//!
//! The simulated device is described by an XML file mirroring the dummy
//! device description shipped with the camera SDK:
//!
//! ```xml
//! <snapscan>
//!   <model>SnapScan VNIR (simulated)</model>
//!   <serial>SIM-0001</serial>
//!   <connected>true</connected>
//!   <calibration_file>calibration_dummy.cal</calibration_file>
//!   <sensor>
//!     <max_width>2048</max_width>
//!     <max_height>2048</max_height>
//!     <raw_bands>16</raw_bands>
//!     <corrected_bands>12</corrected_bands>
//!     <bits_per_sample>12</bits_per_sample>
//!     <first_wavelength_nm>470</first_wavelength_nm>
//!     <last_wavelength_nm>900</last_wavelength_nm>
//!     <dark_level>64</dark_level>
//!     <counts_per_ms>400</counts_per_ms>
//!     <max_integration_time_ms>100</max_integration_time_ms>
//!   </sensor>
//!   <defaults>
//!     <width>1024</width>
//!     <height>1024</height>
//!     <integration_time_ms>5.0</integration_time_ms>
//!   </defaults>
//! </snapscan>
//! ```
//!
//! The calibration file is resolved relative to the XML file and only has
//! to exist.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hsi_pipeline::buffers::{CorrectionCoefficients, CubeLayout, CubeShape};
use crate::hsi_pipeline::common::error::{HsiError, Result};
use crate::hsi_pipeline::device::driver::DeviceDriver;
use crate::hsi_pipeline::device::types::{
    ConfigurationParameters, DeviceHandle, RuntimeParameters, SystemProperties,
};

/// Reflectance of the simulated white calibration tile.
pub const WHITE_TARGET_REFLECTANCE: f32 = 0.95;

/// Fixed-pattern period of the simulated dark current, in columns.
const DARK_PATTERN_PERIOD: usize = 7;

/// Number of distinct reflectance steps in [`Scene::Gradient`].
const GRADIENT_STEPS: usize = 64;

/// What the camera is looking at during a cube acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scene {
    /// The white reference tile
    WhiteTarget,
    /// Diagonal reflectance ramp between 0.1 and 0.9
    Gradient,
    /// Constant reflectance over the whole field
    Uniform(f32),
}

impl Scene {
    pub fn reflectance(&self, x: usize, y: usize) -> f32 {
        match *self {
            Scene::WhiteTarget => WHITE_TARGET_REFLECTANCE,
            Scene::Gradient => {
                let step = (x + y) % GRADIENT_STEPS;
                0.1 + 0.8 * step as f32 / (GRADIENT_STEPS - 1) as f32
            }
            Scene::Uniform(reflectance) => reflectance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DeviceDescription {
    model: String,
    serial: String,
    #[serde(default = "default_connected")]
    connected: bool,
    calibration_file: String,
    sensor: SensorDescription,
    defaults: DefaultParameters,
}

fn default_connected() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct SensorDescription {
    max_width: usize,
    max_height: usize,
    raw_bands: usize,
    corrected_bands: usize,
    bits_per_sample: u32,
    first_wavelength_nm: f32,
    last_wavelength_nm: f32,
    dark_level: f32,
    counts_per_ms: f32,
    max_integration_time_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct DefaultParameters {
    width: usize,
    height: usize,
    integration_time_ms: f64,
}

impl DeviceDescription {
    fn is_usable(&self) -> bool {
        let sensor = &self.sensor;
        sensor.max_width > 0
            && sensor.max_height > 0
            && sensor.raw_bands > 0
            && sensor.corrected_bands > 0
            && (1..=16).contains(&sensor.bits_per_sample)
            && sensor.first_wavelength_nm < sensor.last_wavelength_nm
            && sensor.max_integration_time_ms > 0.0
            && (1..=sensor.max_width).contains(&self.defaults.width)
            && (1..=sensor.max_height).contains(&self.defaults.height)
    }
}

#[derive(Debug)]
struct OpenDevice {
    handle: DeviceHandle,
    description: DeviceDescription,
    configuration: ConfigurationParameters,
    runtime: RuntimeParameters,
    layout: Option<CubeShape>,
    started: bool,
    cubes_read: usize,
}

impl OpenDevice {
    fn max_count(&self) -> f32 {
        ((1u32 << self.description.sensor.bits_per_sample) - 1) as f32
    }

    fn dark_level(&self, x: usize) -> f32 {
        self.description.sensor.dark_level + (x % DARK_PATTERN_PERIOD) as f32
    }

    fn illumination(&self, band: usize) -> f32 {
        let bands = self.description.sensor.raw_bands;
        0.5 + 0.5 * (band + 1) as f32 / bands as f32
    }
}

/// Simulated camera used when no hardware is attached.
#[derive(Debug)]
pub struct SimulatedSnapscan {
    next_handle: u32,
    device: Option<OpenDevice>,
    scenes: Vec<Scene>,
    fail_after: Option<usize>,
}

impl Default for SimulatedSnapscan {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSnapscan {
    /// Looks at the white tile for the first cube and at a gradient sample
    /// afterwards.
    pub fn new() -> Self {
        Self::with_scenes(vec![Scene::WhiteTarget, Scene::Gradient])
    }

    /// Cubes are acquired from `scenes` in order; the last scene repeats.
    pub fn with_scenes(scenes: Vec<Scene>) -> Self {
        Self {
            next_handle: 0,
            device: None,
            scenes,
            fail_after: None,
        }
    }

    /// Makes every cube read after the first `cubes` fail.
    pub fn fail_acquisition_after(mut self, cubes: usize) -> Self {
        self.fail_after = Some(cubes);
        self
    }

    fn device(&self, handle: DeviceHandle) -> Result<&OpenDevice> {
        match &self.device {
            Some(device) if device.handle == handle => Ok(device),
            _ => Err(HsiError::HandleInvalid),
        }
    }

    fn device_mut(&mut self, handle: DeviceHandle) -> Result<&mut OpenDevice> {
        match &mut self.device {
            Some(device) if device.handle == handle => Ok(device),
            _ => Err(HsiError::HandleInvalid),
        }
    }

    fn load_description(path: &Path) -> Result<DeviceDescription> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HsiError::FileNotFound,
            _ => {
                warn!("Failed to read {}: {}", path.display(), e);
                HsiError::FileIoError
            }
        })?;

        let description: DeviceDescription = quick_xml::de::from_str(&text).map_err(|e| {
            warn!("Malformed device description {}: {}", path.display(), e);
            HsiError::FileIoError
        })?;

        if !description.is_usable() {
            warn!("Device description {} is out of range", path.display());
            return Err(HsiError::ArgumentInvalid);
        }

        Ok(description)
    }

    fn calibration_path(config_path: &Path, description: &DeviceDescription) -> PathBuf {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&description.calibration_file)
    }
}

fn band_wavelengths(first: f32, last: f32, bands: usize) -> Vec<f32> {
    if bands == 1 {
        return vec![first];
    }
    let step = (last - first) / (bands - 1) as f32;
    (0..bands).map(|b| first + step * b as f32).collect()
}

impl DeviceDriver for SimulatedSnapscan {
    fn open(&mut self, config_path: &Path) -> Result<DeviceHandle> {
        if self.device.is_some() {
            return Err(HsiError::CallIllegal);
        }

        let description = Self::load_description(config_path)?;
        if !description.connected {
            return Err(HsiError::ConnectionFailed);
        }

        let calibration = Self::calibration_path(config_path, &description);
        if !calibration.is_file() {
            debug!("Calibration file {} missing", calibration.display());
            return Err(HsiError::CalibrationFileNotFound);
        }

        self.next_handle += 1;
        let handle = DeviceHandle::new(self.next_handle).ok_or(HsiError::InternalError)?;

        info!(
            "Opened simulated {} ({}) as {}",
            description.model, description.serial, handle
        );

        let configuration = ConfigurationParameters {
            cube_width: description.defaults.width,
            cube_height: description.defaults.height,
        };
        let runtime = RuntimeParameters {
            integration_time_ms: description.defaults.integration_time_ms,
        };

        self.device = Some(OpenDevice {
            handle,
            description,
            configuration,
            runtime,
            layout: None,
            started: false,
            cubes_read: 0,
        });

        Ok(handle)
    }

    fn close(&mut self, handle: DeviceHandle) -> Result<()> {
        self.device(handle)?;
        self.device = None;
        debug!("Closed simulated device {}", handle);
        Ok(())
    }

    fn system_properties(&self, handle: DeviceHandle) -> Result<SystemProperties> {
        let device = self.device(handle)?;
        let sensor = &device.description.sensor;
        Ok(SystemProperties {
            model: device.description.model.clone(),
            serial_number: device.description.serial.clone(),
            max_width: sensor.max_width,
            max_height: sensor.max_height,
            raw_bands: sensor.raw_bands,
            bits_per_sample: sensor.bits_per_sample,
            min_wavelength_nm: sensor.first_wavelength_nm,
            max_wavelength_nm: sensor.last_wavelength_nm,
            max_integration_time_ms: sensor.max_integration_time_ms,
        })
    }

    fn configuration_parameters(&self, handle: DeviceHandle) -> Result<ConfigurationParameters> {
        Ok(self.device(handle)?.configuration)
    }

    fn set_configuration_parameters(
        &mut self,
        handle: DeviceHandle,
        params: &ConfigurationParameters,
    ) -> Result<()> {
        let device = self.device_mut(handle)?;
        if device.layout.is_some() {
            return Err(HsiError::CallIllegal);
        }

        let sensor = &device.description.sensor;
        if !(1..=sensor.max_width).contains(&params.cube_width)
            || !(1..=sensor.max_height).contains(&params.cube_height)
        {
            return Err(HsiError::ArgumentInvalid);
        }

        device.configuration = *params;
        Ok(())
    }

    fn runtime_parameters(&self, handle: DeviceHandle) -> Result<RuntimeParameters> {
        Ok(self.device(handle)?.runtime)
    }

    fn set_runtime_parameters(
        &mut self,
        handle: DeviceHandle,
        params: &RuntimeParameters,
    ) -> Result<()> {
        let device = self.device_mut(handle)?;
        let limit = device.description.sensor.max_integration_time_ms;
        let t = params.integration_time_ms;
        if !t.is_finite() || t <= 0.0 || t > limit {
            return Err(HsiError::ArgumentInvalid);
        }

        device.runtime = *params;
        Ok(())
    }

    fn initialize(&mut self, handle: DeviceHandle) -> Result<CubeLayout> {
        let device = self.device_mut(handle)?;
        if device.layout.is_some() {
            return Err(HsiError::CallIllegal);
        }

        let sensor = &device.description.sensor;
        let shape = CubeShape::new(
            device.configuration.cube_width,
            device.configuration.cube_height,
            sensor.raw_bands,
        );
        let layout = CubeLayout {
            shape,
            bits_per_sample: sensor.bits_per_sample,
            wavelengths_nm: band_wavelengths(
                sensor.first_wavelength_nm,
                sensor.last_wavelength_nm,
                sensor.raw_bands,
            ),
        };

        device.layout = Some(shape);
        Ok(layout)
    }

    fn start(&mut self, handle: DeviceHandle) -> Result<()> {
        let device = self.device_mut(handle)?;
        if device.layout.is_none() || device.started {
            return Err(HsiError::CallIllegal);
        }
        device.started = true;
        Ok(())
    }

    fn stop(&mut self, handle: DeviceHandle) -> Result<()> {
        let device = self.device_mut(handle)?;
        if !device.started {
            return Err(HsiError::CallIllegal);
        }
        device.started = false;
        Ok(())
    }

    fn read_dark_frame(&mut self, handle: DeviceHandle, frame: &mut [f32]) -> Result<()> {
        let device = self.device(handle)?;
        let shape = match device.layout {
            Some(shape) if device.started => shape,
            _ => return Err(HsiError::CallIllegal),
        };
        if Some(frame.len()) != shape.line_len() {
            return Err(HsiError::DataNotCompatible);
        }

        for band_row in frame.chunks_exact_mut(shape.width) {
            for (x, value) in band_row.iter_mut().enumerate() {
                *value = device.dark_level(x);
            }
        }
        Ok(())
    }

    fn read_cube(&mut self, handle: DeviceHandle, cube: &mut [f32]) -> Result<()> {
        let scenes_len = self.scenes.len();
        let fail_after = self.fail_after;
        let device = self.device(handle)?;
        let shape = match device.layout {
            Some(shape) if device.started => shape,
            _ => return Err(HsiError::CallIllegal),
        };
        if Some(cube.len()) != shape.sample_count() {
            return Err(HsiError::DataNotCompatible);
        }
        if fail_after.is_some_and(|limit| device.cubes_read >= limit) {
            warn!("Simulated acquisition fault after {} cubes", device.cubes_read);
            return Err(HsiError::AcquisitionFailed);
        }
        let scene = match scenes_len {
            0 => Scene::Uniform(0.0),
            n => self.scenes[device.cubes_read.min(n - 1)],
        };

        debug!(
            "Scanning {}x{}x{} cube of {:?} at {} ms",
            shape.width, shape.height, shape.bands, scene, device.runtime.integration_time_ms
        );

        let exposure =
            device.description.sensor.counts_per_ms * device.runtime.integration_time_ms as f32;
        let max_count = device.max_count();

        for (index, band_row) in cube.chunks_exact_mut(shape.width).enumerate() {
            let y = index / shape.bands;
            let band = index % shape.bands;
            let gain = device.illumination(band) * exposure;
            for (x, value) in band_row.iter_mut().enumerate() {
                let signal = scene.reflectance(x, y) * gain;
                *value = (device.dark_level(x) + signal).min(max_count);
            }
        }

        self.device_mut(handle)?.cubes_read += 1;
        Ok(())
    }

    fn correction_matrix(&self, handle: DeviceHandle) -> Result<CorrectionCoefficients> {
        let device = self.device(handle)?;
        if !device.started {
            return Err(HsiError::CallIllegal);
        }

        let sensor = &device.description.sensor;
        let raw_bands = sensor.raw_bands;
        let corrected_bands = sensor.corrected_bands;
        let first = sensor.first_wavelength_nm;
        let last = sensor.last_wavelength_nm;
        let wavelengths_nm = band_wavelengths(first, last, corrected_bands);

        // Linear interpolation between the two raw bands around each
        // corrected wavelength; every row sums to one.
        let mut coefficients = vec![0.0f32; raw_bands * corrected_bands];
        for (row, &wavelength) in coefficients.chunks_exact_mut(raw_bands).zip(&wavelengths_nm) {
            if raw_bands == 1 {
                row[0] = 1.0;
                continue;
            }
            let position = ((wavelength - first) / (last - first) * (raw_bands - 1) as f32)
                .clamp(0.0, (raw_bands - 1) as f32);
            let lower = (position.floor() as usize).min(raw_bands - 2);
            let fraction = position - lower as f32;
            row[lower] = 1.0 - fraction;
            row[lower + 1] = fraction;
        }

        Ok(CorrectionCoefficients {
            raw_bands,
            corrected_bands,
            coefficients,
            wavelengths_nm,
        })
    }
}
