use tracing::debug;

use crate::hsi_pipeline::buffers::{CorrectionMatrix, CubeFloat, CubeShape};
use crate::hsi_pipeline::common::error::{HsiError, Result};

/// Applies `matrix` to every pixel of `raw`, writing into `corrected`.
///
/// For each scan line `y` and corrected band `j`:
/// `corrected[y, j, x] = sum_i matrix[j, i] * raw[y, i, x]`, accumulated
/// in raw band order.
///
/// `corrected` must be allocated with the width and height of `raw` and the
/// corrected band count of `matrix`. On failure `corrected` is left
/// untouched, including its validity flag.
pub fn apply_spectral_correction(
    corrected: &mut CubeFloat,
    raw: &CubeFloat,
    matrix: &CorrectionMatrix,
) -> Result<()> {
    if !corrected.is_allocated() || !raw.is_allocated() {
        return Err(HsiError::DataNotAllocated);
    }

    let raw_shape = raw.shape();
    let expected = CubeShape::new(raw_shape.width, raw_shape.height, matrix.corrected_bands());
    if raw_shape.bands != matrix.raw_bands() || corrected.shape() != expected {
        debug!(
            "Spectral correction shape mismatch: raw {:?}, corrected {:?}, matrix {}->{}",
            raw_shape,
            corrected.shape(),
            matrix.raw_bands(),
            matrix.corrected_bands()
        );
        return Err(HsiError::DataNotCompatible);
    }
    if !raw.is_valid() || !matrix.is_valid() {
        return Err(HsiError::DataNotValid);
    }

    let width = raw_shape.width;
    let raw_line_len = width * raw_shape.bands;
    let corrected_line_len = width * expected.bands;

    let raw_lines = raw.data().chunks_exact(raw_line_len);
    let corrected_lines = corrected.data_mut().chunks_exact_mut(corrected_line_len);
    for (raw_line, corrected_line) in raw_lines.zip(corrected_lines) {
        for (band, out) in corrected_line.chunks_exact_mut(width).enumerate() {
            out.fill(0.0);
            for (coefficient, input) in matrix.row(band).iter().zip(raw_line.chunks_exact(width)) {
                if *coefficient == 0.0 {
                    continue;
                }
                for (o, i) in out.iter_mut().zip(input) {
                    *o += coefficient * i;
                }
            }
        }
    }

    corrected.set_wavelengths_nm(matrix.wavelengths_nm());
    corrected.set_valid(true);
    Ok(())
}
