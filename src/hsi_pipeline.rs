//! Hyperspectral acquisition pipeline
//!
//! Drives a line-scan hyperspectral camera through a capture session:
//! device setup, dark and white references, cube acquisition, spectral
//! correction, white-reference normalization and cube storage.

pub mod acquisition;
pub mod buffers;
pub mod common;
pub mod correction;
pub mod device;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use acquisition::{
    AcquisitionConfig, AcquisitionConfigBuilder, AcquisitionPipeline, AutoConfirm,
    OperatorConsole, ScanPlan, ScanPosition, StageTimings, StdinConsole,
};
pub use buffers::{BufferAllocator, CubeFloat, FrameFloat, ResourceLedger};
pub use common::{AcquisitionError, CallError, HsiError, Result, Stage};
pub use correction::{CorrectionPipeline, apply_spectral_correction, apply_white_reference};
pub use device::{DeviceDriver, DeviceSession, SimulatedSnapscan};
pub use storage::{CubeFileFormat, CubeWriter, EnviWriter, TiffCompression, TiffCubeWriter};
