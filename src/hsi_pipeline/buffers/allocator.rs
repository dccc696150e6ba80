use tracing::debug;

use crate::hsi_pipeline::buffers::ledger::{BufferKind, ResourceLedger};
use crate::hsi_pipeline::buffers::types::{
    CorrectionCoefficients, CorrectionMatrix, CubeDataFormat, CubeFloat, CubeLayout, CubeShape,
    FrameFloat, FrameShape,
};
use crate::hsi_pipeline::common::error::{HsiError, Result};

/// Allocates image buffers and registers each one with the ledger.
///
/// A failed allocation leaves no ledger entry behind.
#[derive(Debug, Clone, Default)]
pub struct BufferAllocator {
    ledger: ResourceLedger,
}

impl BufferAllocator {
    pub fn new(ledger: ResourceLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Allocates an acquisition cube shaped like `format`.
    pub fn allocate_cube(&self, format: &CubeDataFormat, label: &str) -> Result<CubeFloat> {
        self.allocate_cube_with_shape(format.shape(), format.wavelengths_nm(), label)
    }

    /// Allocates the output cube of a spectral correction: the spatial size
    /// of `format` with the band count of `matrix`.
    pub fn allocate_cube_corrected(
        &self,
        matrix: &CorrectionMatrix,
        format: &CubeDataFormat,
        label: &str,
    ) -> Result<CubeFloat> {
        if matrix.raw_bands() != format.shape().bands {
            return Err(HsiError::DataNotCompatible);
        }
        let shape = CubeShape::new(
            format.shape().width,
            format.shape().height,
            matrix.corrected_bands(),
        );
        self.allocate_cube_with_shape(shape, matrix.wavelengths_nm(), label)
    }

    pub fn allocate_cube_with_shape(
        &self,
        shape: CubeShape,
        wavelengths_nm: &[f32],
        label: &str,
    ) -> Result<CubeFloat> {
        if shape.is_empty() {
            return Err(HsiError::AllocationError);
        }
        let len = shape.sample_count().ok_or(HsiError::AllocationError)?;
        let data = zeroed(len)?;

        debug!(
            "Allocating cube '{}': {}x{}x{} ({} bytes)",
            label,
            shape.width,
            shape.height,
            shape.bands,
            len * std::mem::size_of::<f32>()
        );

        let allocation = self.ledger.allocate(BufferKind::Cube, label);
        Ok(CubeFloat::new(shape, data, wavelengths_nm.to_vec(), allocation))
    }

    pub fn allocate_frame(&self, shape: FrameShape, label: &str) -> Result<FrameFloat> {
        if shape.is_empty() {
            return Err(HsiError::AllocationError);
        }
        let len = shape.sample_count().ok_or(HsiError::AllocationError)?;
        let data = zeroed(len)?;
        let allocation = self.ledger.allocate(BufferKind::Frame, label);
        Ok(FrameFloat::new(shape, data, allocation))
    }

    pub fn allocate_cube_format(&self, layout: CubeLayout) -> Result<CubeDataFormat> {
        if layout.shape.is_empty() || layout.wavelengths_nm.len() != layout.shape.bands {
            return Err(HsiError::DataNotCompatible);
        }
        let allocation = self.ledger.allocate(BufferKind::CubeDataFormat, "cube_format");
        Ok(CubeDataFormat::new(layout, allocation))
    }

    pub fn allocate_correction_matrix(
        &self,
        coefficients: CorrectionCoefficients,
    ) -> Result<CorrectionMatrix> {
        if !coefficients.is_consistent() {
            return Err(HsiError::DataNotCompatible);
        }
        let allocation = self
            .ledger
            .allocate(BufferKind::CorrectionMatrix, "correction_matrix");
        Ok(CorrectionMatrix::new(coefficients, allocation))
    }
}

fn zeroed(len: usize) -> Result<Vec<f32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| HsiError::AllocationError)?;
    data.resize(len, 0.0);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(width: usize, height: usize, bands: usize) -> CubeLayout {
        CubeLayout {
            shape: CubeShape::new(width, height, bands),
            bits_per_sample: 12,
            wavelengths_nm: (0..bands).map(|b| 500.0 + b as f32 * 10.0).collect(),
        }
    }

    fn coefficients(raw_bands: usize, corrected_bands: usize) -> CorrectionCoefficients {
        CorrectionCoefficients {
            raw_bands,
            corrected_bands,
            coefficients: vec![0.5; raw_bands * corrected_bands],
            wavelengths_nm: (0..corrected_bands).map(|b| 505.0 + b as f32 * 10.0).collect(),
        }
    }

    #[test]
    fn test_cube_follows_format() {
        let allocator = BufferAllocator::default();
        let format = allocator.allocate_cube_format(layout(4, 3, 2)).unwrap();
        let cube = allocator.allocate_cube(&format, "cube").unwrap();

        assert_eq!(cube.shape(), CubeShape::new(4, 3, 2));
        assert_eq!(cube.data().len(), 24);
        assert!(cube.is_allocated());
        assert!(!cube.is_valid());
        assert_eq!(cube.wavelengths_nm(), format.wavelengths_nm());
    }

    #[test]
    fn test_corrected_cube_uses_matrix_bands() {
        let allocator = BufferAllocator::default();
        let format = allocator.allocate_cube_format(layout(4, 3, 5)).unwrap();
        let matrix = allocator.allocate_correction_matrix(coefficients(5, 2)).unwrap();
        let cube = allocator
            .allocate_cube_corrected(&matrix, &format, "cube_corrected")
            .unwrap();

        assert_eq!(cube.shape(), CubeShape::new(4, 3, 2));
        assert_eq!(cube.wavelengths_nm(), matrix.wavelengths_nm());
    }

    #[test]
    fn test_corrected_cube_rejects_band_mismatch() {
        let allocator = BufferAllocator::default();
        let format = allocator.allocate_cube_format(layout(4, 3, 5)).unwrap();
        let matrix = allocator.allocate_correction_matrix(coefficients(6, 2)).unwrap();

        let result = allocator.allocate_cube_corrected(&matrix, &format, "cube_corrected");
        assert_eq!(result.unwrap_err(), HsiError::DataNotCompatible);
        assert_eq!(allocator.ledger().allocations_of(BufferKind::Cube), 0);
    }

    #[test]
    fn test_empty_shape_fails_without_ledger_entry() {
        let allocator = BufferAllocator::default();
        let result = allocator.allocate_cube_with_shape(CubeShape::new(0, 10, 4), &[], "cube");

        assert_eq!(result.unwrap_err(), HsiError::AllocationError);
        assert!(allocator.ledger().entries().is_empty());
    }

    #[test]
    fn test_oversized_shape_fails() {
        let allocator = BufferAllocator::default();
        let shape = CubeShape::new(usize::MAX / 2, 4, 4);
        let result = allocator.allocate_cube_with_shape(shape, &[], "cube");

        assert_eq!(result.unwrap_err(), HsiError::AllocationError);
        assert!(allocator.ledger().entries().is_empty());
    }

    #[test]
    fn test_every_buffer_is_released_on_drop() {
        let allocator = BufferAllocator::default();
        {
            let format = allocator.allocate_cube_format(layout(2, 2, 3)).unwrap();
            let matrix = allocator.allocate_correction_matrix(coefficients(3, 2)).unwrap();
            let _frame = allocator
                .allocate_frame(format.shape().frame_shape(), "dark_reference")
                .unwrap();
            let _cube = allocator.allocate_cube(&format, "cube").unwrap();
            let _corrected = allocator
                .allocate_cube_corrected(&matrix, &format, "cube_corrected")
                .unwrap();
            assert_eq!(allocator.ledger().outstanding().len(), 5);
        }

        let ledger = allocator.ledger();
        assert!(ledger.is_balanced());
        assert!(ledger.entries().iter().all(|e| e.allocations == 1 && e.deallocations == 1));
    }
}
