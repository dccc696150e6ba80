//! Acquisition orchestration module
//!
//! Sequences the device session, the correction pipeline and the cube
//! writer into the capture workflow, stopping at the first failure.

mod config;
mod console;
mod pipeline;
mod scan_plan;
mod timing;


pub use config::{
    AcquisitionConfig, AcquisitionConfigBuilder, DEFAULT_DEVICE_CONFIG_PATH,
    DEFAULT_INTEGRATION_TIME_MS, DEFAULT_LOG_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_RESOLUTION,
    REFERENCE_CUBE_NAME, SAMPLE_CUBE_NAME,
};
pub use console::{AutoConfirm, OperatorConsole, StdinConsole};
pub use pipeline::{AcquisitionPipeline, SessionBuffers};
pub use scan_plan::{ScanPlan, ScanPosition, ScanPositions};
pub use timing::{StageTiming, StageTimings, Timer};
