//! Fixtures shared by the unit tests.

use std::path::PathBuf;

use tempfile::TempDir;

pub(crate) struct DeviceFixture {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

pub(crate) struct DeviceSpec {
    pub connected: bool,
    pub with_calibration: bool,
    pub max_width: usize,
    pub max_height: usize,
    pub raw_bands: usize,
    pub corrected_bands: usize,
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self {
            connected: true,
            with_calibration: true,
            max_width: 2048,
            max_height: 2048,
            raw_bands: 6,
            corrected_bands: 4,
        }
    }
}

impl DeviceFixture {
    pub fn new() -> Self {
        Self::with_spec(DeviceSpec::default())
    }

    pub fn with_spec(spec: DeviceSpec) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("snapscan_test.xml");

        let xml = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<snapscan>
  <model>SnapScan VNIR (test)</model>
  <serial>TEST-0001</serial>
  <connected>{connected}</connected>
  <calibration_file>calibration_test.cal</calibration_file>
  <sensor>
    <max_width>{max_width}</max_width>
    <max_height>{max_height}</max_height>
    <raw_bands>{raw_bands}</raw_bands>
    <corrected_bands>{corrected_bands}</corrected_bands>
    <bits_per_sample>12</bits_per_sample>
    <first_wavelength_nm>470</first_wavelength_nm>
    <last_wavelength_nm>900</last_wavelength_nm>
    <dark_level>64</dark_level>
    <counts_per_ms>400</counts_per_ms>
    <max_integration_time_ms>100</max_integration_time_ms>
  </sensor>
  <defaults>
    <width>16</width>
    <height>8</height>
    <integration_time_ms>5.0</integration_time_ms>
  </defaults>
</snapscan>
"#,
            connected = spec.connected,
            max_width = spec.max_width,
            max_height = spec.max_height,
            raw_bands = spec.raw_bands,
            corrected_bands = spec.corrected_bands,
        );
        std::fs::write(&config_path, xml).unwrap();

        if spec.with_calibration {
            std::fs::write(dir.path().join("calibration_test.cal"), "# test calibration\n")
                .unwrap();
        }

        Self { dir, config_path }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }
}
