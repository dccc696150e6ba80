use std::path::{Path, PathBuf};

use tracing::warn;

use crate::hsi_pipeline::buffers::CubeFloat;
use crate::hsi_pipeline::common::error::{HsiError, Result};
use crate::hsi_pipeline::storage::envi_writer::EnviWriter;
use crate::hsi_pipeline::storage::tiff_writer::TiffCubeWriter;
use crate::hsi_pipeline::storage::types::CubeFileFormat;

pub trait CubeWriter {
    /// Persists `cube` as `name` inside `dir` and returns the primary file.
    fn write_cube(&self, cube: &CubeFloat, dir: &Path, name: &str) -> Result<PathBuf>;
}

pub fn writer_for(format: CubeFileFormat) -> Box<dyn CubeWriter> {
    match format {
        CubeFileFormat::Envi => Box::new(EnviWriter),
        CubeFileFormat::Tiff(compression) => Box::new(TiffCubeWriter::new(compression)),
    }
}

/// Checks that `cube` may be saved and that `dir` exists or can be created.
pub(crate) fn prepare_output(cube: &CubeFloat, dir: &Path) -> Result<()> {
    if !cube.is_allocated() {
        return Err(HsiError::DataNotAllocated);
    }
    if !cube.is_valid() {
        return Err(HsiError::DataNotValid);
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        warn!("Cannot create output directory {}: {}", dir.display(), e);
        HsiError::FileSystemError
    })
}

pub(crate) fn io_failure(path: &Path, e: impl std::fmt::Display) -> HsiError {
    warn!("Failed to write {}: {}", path.display(), e);
    HsiError::FileIoError
}
