use tracing::{info_span, instrument};

use crate::hsi_pipeline::buffers::{BufferAllocator, CorrectionMatrix, CubeDataFormat, CubeFloat};
use crate::hsi_pipeline::common::error::Result;
use crate::hsi_pipeline::correction::{apply_spectral_correction, apply_white_reference};

/// Reflectance of the white calibration tile (it is not a perfect reflector).
pub const DEFAULT_WHITE_REFERENCE_FACTOR: f64 = 0.95;

/// Spectral correction followed by white-reference normalization.
#[derive(Debug, Clone)]
pub struct CorrectionPipeline {
    allocator: BufferAllocator,
    white_reference_factor: f64,
}

impl CorrectionPipeline {
    pub fn new(allocator: BufferAllocator, white_reference_factor: f64) -> Self {
        Self {
            allocator,
            white_reference_factor,
        }
    }

    pub fn white_reference_factor(&self) -> f64 {
        self.white_reference_factor
    }

    /// Allocates a corrected cube for `matrix` and `format`.
    pub fn allocate_corrected(
        &self,
        matrix: &CorrectionMatrix,
        format: &CubeDataFormat,
        label: &str,
    ) -> Result<CubeFloat> {
        self.allocator.allocate_cube_corrected(matrix, format, label)
    }

    pub fn apply_spectral_correction(
        &self,
        corrected: &mut CubeFloat,
        raw: &CubeFloat,
        matrix: &CorrectionMatrix,
    ) -> Result<()> {
        let _span = info_span!("spectral_correction").entered();
        apply_spectral_correction(corrected, raw, matrix)
    }

    /// Normalizes a corrected sample in place with the configured factor.
    pub fn apply_white_reference(&self, sample: &mut CubeFloat, reference: &CubeFloat) -> Result<()> {
        let _span = info_span!("white_reference").entered();
        apply_white_reference(sample, reference, self.white_reference_factor)
    }

    /// Allocates the destination and spectrally corrects `raw` into it.
    #[instrument(skip_all, fields(label = label))]
    pub fn correct(
        &self,
        raw: &CubeFloat,
        matrix: &CorrectionMatrix,
        format: &CubeDataFormat,
        label: &str,
    ) -> Result<CubeFloat> {
        let mut corrected = self.allocate_corrected(matrix, format, label)?;
        self.apply_spectral_correction(&mut corrected, raw, matrix)?;
        Ok(corrected)
    }
}
