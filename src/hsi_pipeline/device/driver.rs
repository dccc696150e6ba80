use std::path::Path;

use crate::hsi_pipeline::buffers::{CorrectionCoefficients, CubeLayout};
use crate::hsi_pipeline::common::error::Result;
use crate::hsi_pipeline::device::types::{
    ConfigurationParameters, DeviceHandle, RuntimeParameters, SystemProperties,
};

/// Transport to a physical (or simulated) camera.
///
/// Every call blocks until the device answers. Buffers are owned by the
/// caller; the driver only fills the slices it is handed. Frame and cube
/// slices use the BIL layout of [`crate::hsi_pipeline::buffers::types`].
pub trait DeviceDriver {
    fn open(&mut self, config_path: &Path) -> Result<DeviceHandle>;
    fn close(&mut self, handle: DeviceHandle) -> Result<()>;

    fn system_properties(&self, handle: DeviceHandle) -> Result<SystemProperties>;
    fn configuration_parameters(&self, handle: DeviceHandle) -> Result<ConfigurationParameters>;
    fn set_configuration_parameters(
        &mut self,
        handle: DeviceHandle,
        params: &ConfigurationParameters,
    ) -> Result<()>;
    fn runtime_parameters(&self, handle: DeviceHandle) -> Result<RuntimeParameters>;
    fn set_runtime_parameters(
        &mut self,
        handle: DeviceHandle,
        params: &RuntimeParameters,
    ) -> Result<()>;

    /// Applies the configuration and reports the raw output cube layout.
    fn initialize(&mut self, handle: DeviceHandle) -> Result<CubeLayout>;
    fn start(&mut self, handle: DeviceHandle) -> Result<()>;
    fn stop(&mut self, handle: DeviceHandle) -> Result<()>;

    /// Reads one unilluminated sensor line into `frame`.
    fn read_dark_frame(&mut self, handle: DeviceHandle, frame: &mut [f32]) -> Result<()>;
    /// Scans one raw cube into `cube`, dark current included.
    fn read_cube(&mut self, handle: DeviceHandle, cube: &mut [f32]) -> Result<()>;
    fn correction_matrix(&self, handle: DeviceHandle) -> Result<CorrectionCoefficients>;
}
