use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::hsi_pipeline::buffers::{
    BufferAllocator, CorrectionMatrix, CubeDataFormat, CubeFloat, CubeLayout, FrameFloat,
};
use crate::hsi_pipeline::common::error::{HsiError, Result};
use crate::hsi_pipeline::device::driver::DeviceDriver;
use crate::hsi_pipeline::device::types::{
    ConfigurationParameters, DeviceHandle, DeviceState, RuntimeParameters, SystemProperties,
};

/// Owns the device handle and its property records, and rejects calls that
/// are illegal in the current [`DeviceState`].
///
/// `Closed -> Opened -> Configured -> Initialized -> Started -> Stopped`.
/// Any open session is closed when dropped.
pub struct DeviceSession<D: DeviceDriver> {
    driver: D,
    allocator: BufferAllocator,
    handle: Option<DeviceHandle>,
    state: DeviceState,
    system: SystemProperties,
    configuration: ConfigurationParameters,
    runtime: RuntimeParameters,
    layout: Option<CubeLayout>,
}

impl<D: DeviceDriver> DeviceSession<D> {
    pub fn new(driver: D, allocator: BufferAllocator) -> Self {
        Self {
            driver,
            allocator,
            handle: None,
            state: DeviceState::Closed,
            system: SystemProperties::default(),
            configuration: ConfigurationParameters::default(),
            runtime: RuntimeParameters::default(),
            layout: None,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn handle(&self) -> Option<DeviceHandle> {
        self.handle
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Last configuration pushed to or read from the device.
    pub fn configuration(&self) -> &ConfigurationParameters {
        &self.configuration
    }

    /// Last runtime parameters pushed to or read from the device.
    pub fn runtime(&self) -> &RuntimeParameters {
        &self.runtime
    }

    fn require_handle(&self) -> Result<DeviceHandle> {
        self.handle.ok_or(HsiError::HandleInvalid)
    }

    fn require_state(&self, allowed: &[DeviceState]) -> Result<DeviceHandle> {
        let handle = self.require_handle()?;
        if !allowed.contains(&self.state) {
            debug!("Call rejected in state {:?}", self.state);
            return Err(HsiError::CallIllegal);
        }
        Ok(handle)
    }

    #[instrument(skip(self, config_path), fields(path = %config_path.display()))]
    pub fn open(&mut self, config_path: &Path) -> Result<DeviceHandle> {
        if self.handle.is_some() {
            return Err(HsiError::CallIllegal);
        }

        let handle = self.driver.open(config_path)?;
        self.handle = Some(handle);
        self.state = DeviceState::Opened;

        info!("Device opened ({})", handle);
        Ok(handle)
    }

    pub fn system_properties(&mut self) -> Result<&SystemProperties> {
        let handle = self.require_handle()?;
        self.system = self.driver.system_properties(handle)?;
        Ok(&self.system)
    }

    pub fn configuration_parameters(&mut self) -> Result<&ConfigurationParameters> {
        let handle = self.require_handle()?;
        self.configuration = self.driver.configuration_parameters(handle)?;
        Ok(&self.configuration)
    }

    pub fn runtime_parameters(&mut self) -> Result<&RuntimeParameters> {
        let handle = self.require_handle()?;
        self.runtime = self.driver.runtime_parameters(handle)?;
        Ok(&self.runtime)
    }

    /// Pushes a new cube resolution; only legal before initialization.
    pub fn set_configuration_parameters(&mut self, width: usize, height: usize) -> Result<()> {
        let handle = self.require_state(&[DeviceState::Opened, DeviceState::Configured])?;

        let params = ConfigurationParameters {
            cube_width: width,
            cube_height: height,
        };
        self.driver.set_configuration_parameters(handle, &params)?;
        self.configuration = params;
        self.state = DeviceState::Configured;

        debug!("Resolution set to {}x{}", width, height);
        Ok(())
    }

    /// Initializes the device and returns the layout of the cubes it produces.
    pub fn initialize(&mut self) -> Result<CubeDataFormat> {
        let handle = self.require_state(&[DeviceState::Configured])?;

        let layout = self.driver.initialize(handle)?;
        self.state = DeviceState::Initialized;

        if layout.shape.width != self.configuration.cube_width
            || layout.shape.height != self.configuration.cube_height
        {
            warn!(
                "Device reported {}x{} for configured {}x{}",
                layout.shape.width,
                layout.shape.height,
                self.configuration.cube_width,
                self.configuration.cube_height
            );
            return Err(HsiError::InternalError);
        }

        let format = self.allocator.allocate_cube_format(layout.clone())?;
        self.layout = Some(layout);

        info!(
            "Cube format: {}x{}x{} at {} bits",
            format.shape().width,
            format.shape().height,
            format.shape().bands,
            format.bits_per_sample()
        );
        Ok(format)
    }

    pub fn set_runtime_parameters(&mut self, integration_time_ms: f64) -> Result<()> {
        let handle = self.require_state(&[
            DeviceState::Initialized,
            DeviceState::Started,
            DeviceState::Stopped,
        ])?;

        let params = RuntimeParameters {
            integration_time_ms,
        };
        self.driver.set_runtime_parameters(handle, &params)?;
        self.runtime = params;

        debug!("Integration time set to {} ms", integration_time_ms);
        Ok(())
    }

    /// Starts acquisition and captures the dark reference and the correction
    /// matrix every later correction depends on.
    pub fn start(&mut self) -> Result<(FrameFloat, CorrectionMatrix)> {
        let handle = self.require_state(&[DeviceState::Initialized])?;
        let frame_shape = self
            .layout
            .as_ref()
            .map(|layout| layout.shape.frame_shape())
            .ok_or(HsiError::CallIllegal)?;

        self.driver.start(handle)?;
        self.state = DeviceState::Started;

        let mut dark_reference = self.allocator.allocate_frame(frame_shape, "dark_reference")?;
        self.driver
            .read_dark_frame(handle, dark_reference.data_mut())?;
        dark_reference.set_valid(true);

        let coefficients = self.driver.correction_matrix(handle)?;
        let correction_matrix = self.allocator.allocate_correction_matrix(coefficients)?;

        info!(
            "Acquisition started, correction matrix {} -> {} bands",
            correction_matrix.raw_bands(),
            correction_matrix.corrected_bands()
        );
        Ok((dark_reference, correction_matrix))
    }

    /// Allocates a raw cube and scans into it with the dark current removed.
    pub fn acquire_cube(&mut self, dark_reference: &FrameFloat, label: &str) -> Result<CubeFloat> {
        let layout = self.started_layout()?;
        let mut cube =
            self.allocator
                .allocate_cube_with_shape(layout.shape, &layout.wavelengths_nm, label)?;
        self.acquire_cube_into(dark_reference, &mut cube)?;
        Ok(cube)
    }

    /// Scans into a pre-allocated raw cube with the dark current removed.
    pub fn acquire_cube_into(
        &mut self,
        dark_reference: &FrameFloat,
        cube: &mut CubeFloat,
    ) -> Result<()> {
        let handle = self.require_state(&[DeviceState::Started])?;
        let shape = self.started_layout()?.shape;

        if !cube.is_allocated() || !dark_reference.is_allocated() {
            return Err(HsiError::DataNotAllocated);
        }
        if cube.shape() != shape || dark_reference.shape() != shape.frame_shape() {
            return Err(HsiError::DataNotCompatible);
        }
        if !dark_reference.is_valid() {
            return Err(HsiError::DataNotValid);
        }

        cube.set_valid(false);
        self.driver.read_cube(handle, cube.data_mut())?;

        let dark = dark_reference.data();
        for line in cube.data_mut().chunks_exact_mut(dark.len()) {
            for (value, offset) in line.iter_mut().zip(dark) {
                *value -= offset;
            }
        }
        cube.set_valid(true);

        debug!("Cube acquired: {}x{}x{}", shape.width, shape.height, shape.bands);
        Ok(())
    }

    fn started_layout(&self) -> Result<&CubeLayout> {
        self.require_state(&[DeviceState::Started])?;
        self.layout.as_ref().ok_or(HsiError::CallIllegal)
    }

    pub fn stop(&mut self) -> Result<()> {
        let handle = self.require_state(&[DeviceState::Started])?;
        self.driver.stop(handle)?;
        self.state = DeviceState::Stopped;
        Ok(())
    }

    /// Releases the handle, even when the driver reports a failure.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(HsiError::HandleInvalid)?;
        self.state = DeviceState::Closed;
        self.layout = None;
        self.driver.close(handle)?;

        info!("Device closed ({})", handle);
        Ok(())
    }
}

impl<D: DeviceDriver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.state == DeviceState::Started {
            if let Err(e) = self.driver.stop(handle) {
                warn!("Failed to stop device {} on drop: {}", handle, e);
            }
        }
        if let Err(e) = self.driver.close(handle) {
            warn!("Failed to close device {} on drop: {}", handle, e);
        }
    }
}
