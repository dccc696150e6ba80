//! Acquisition configuration types

use std::path::PathBuf;

use tracing::Level;

use crate::hsi_pipeline::acquisition::scan_plan::ScanPlan;
use crate::hsi_pipeline::correction::DEFAULT_WHITE_REFERENCE_FACTOR;
use crate::hsi_pipeline::storage::CubeFileFormat;

pub const DEFAULT_DEVICE_CONFIG_PATH: &str = "./resources/snapscan_dummy.xml";
/// Cube width and height (scan lines)
pub const DEFAULT_RESOLUTION: (usize, usize) = (2048, 1088);
pub const DEFAULT_INTEGRATION_TIME_MS: f64 = 1.6;
pub const DEFAULT_OUTPUT_DIR: &str = "./";
pub const DEFAULT_LOG_DIR: &str = "./logs/";

/// File name of the saved white reference cube
pub const REFERENCE_CUBE_NAME: &str = "reference_corrected";
/// File name of the saved sample cube
pub const SAMPLE_CUBE_NAME: &str = "cube_corrected";

/// Configuration for one acquisition run
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Device description handed to the driver on open
    pub device_config_path: PathBuf,
    /// Target cube resolution as (width, height)
    pub resolution: (usize, usize),
    /// Exposure per scan line in milliseconds
    pub integration_time_ms: f64,
    /// Reflectance of the white reference tile
    pub white_reference_factor: f64,
    /// Directory the corrected cubes are saved to
    pub output_dir: PathBuf,
    pub file_format: CubeFileFormat,
    pub log_dir: PathBuf,
    /// Minimum severity written to the log file
    pub log_level: Level,
    pub scan_plan: ScanPlan,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            device_config_path: PathBuf::from(DEFAULT_DEVICE_CONFIG_PATH),
            resolution: DEFAULT_RESOLUTION,
            integration_time_ms: DEFAULT_INTEGRATION_TIME_MS,
            white_reference_factor: DEFAULT_WHITE_REFERENCE_FACTOR,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            file_format: CubeFileFormat::Envi,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: Level::WARN,
            scan_plan: ScanPlan::single(),
        }
    }
}

impl AcquisitionConfig {
    pub fn builder() -> AcquisitionConfigBuilder {
        AcquisitionConfigBuilder::default()
    }
}

/// Builder for AcquisitionConfig
#[derive(Default)]
pub struct AcquisitionConfigBuilder {
    device_config_path: Option<PathBuf>,
    resolution: Option<(usize, usize)>,
    integration_time_ms: Option<f64>,
    white_reference_factor: Option<f64>,
    output_dir: Option<PathBuf>,
    file_format: Option<CubeFileFormat>,
    log_dir: Option<PathBuf>,
    log_level: Option<Level>,
    scan_plan: Option<ScanPlan>,
}

impl AcquisitionConfigBuilder {
    pub fn device_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.device_config_path = Some(path.into());
        self
    }

    pub fn resolution(mut self, width: usize, height: usize) -> Self {
        self.resolution = Some((width, height));
        self
    }

    pub fn integration_time_ms(mut self, integration_time_ms: f64) -> Self {
        self.integration_time_ms = Some(integration_time_ms);
        self
    }

    pub fn white_reference_factor(mut self, factor: f64) -> Self {
        self.white_reference_factor = Some(factor);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn file_format(mut self, format: CubeFileFormat) -> Self {
        self.file_format = Some(format);
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn scan_plan(mut self, plan: ScanPlan) -> Self {
        self.scan_plan = Some(plan);
        self
    }

    pub fn build(self) -> AcquisitionConfig {
        let default = AcquisitionConfig::default();
        AcquisitionConfig {
            device_config_path: self
                .device_config_path
                .unwrap_or(default.device_config_path),
            resolution: self.resolution.unwrap_or(default.resolution),
            integration_time_ms: self
                .integration_time_ms
                .unwrap_or(default.integration_time_ms),
            white_reference_factor: self
                .white_reference_factor
                .unwrap_or(default.white_reference_factor),
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            file_format: self.file_format.unwrap_or(default.file_format),
            log_dir: self.log_dir.unwrap_or(default.log_dir),
            log_level: self.log_level.unwrap_or(default.log_level),
            scan_plan: self.scan_plan.unwrap_or(default.scan_plan),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsi_pipeline::storage::TiffCompression;

    #[test]
    fn test_defaults_match_capture_constants() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.resolution, (2048, 1088));
        assert_eq!(config.integration_time_ms, 1.6);
        assert_eq!(config.white_reference_factor, 0.95);
        assert_eq!(
            config.device_config_path,
            PathBuf::from("./resources/snapscan_dummy.xml")
        );
        assert_eq!(config.file_format, CubeFileFormat::Envi);
        assert_eq!(config.log_level, Level::WARN);
        assert_eq!(config.scan_plan.len(), 1);
    }

    #[test]
    fn test_builder_overrides() {
        let config = AcquisitionConfig::builder()
            .resolution(640, 480)
            .integration_time_ms(3.2)
            .file_format(CubeFileFormat::Tiff(TiffCompression::Lzw))
            .output_dir("/tmp/cubes")
            .build();

        assert_eq!(config.resolution, (640, 480));
        assert_eq!(config.integration_time_ms, 3.2);
        assert_eq!(config.file_format, CubeFileFormat::Tiff(TiffCompression::Lzw));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/cubes"));
        assert_eq!(config.white_reference_factor, 0.95);
        assert_eq!(config.log_dir, PathBuf::from("./logs/"));
    }
}
