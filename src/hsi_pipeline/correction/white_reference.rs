use tracing::{debug, warn};

use crate::hsi_pipeline::buffers::CubeFloat;
use crate::hsi_pipeline::common::error::{HsiError, Result};

/// Normalizes `sample` in place against `reference`:
/// `sample = sample / reference * factor` for every pixel and band.
///
/// `factor` is the reflectance of the white tile the reference was taken
/// from. Each element is computed in `f64` and stored as `f32`.
///
/// Reference samples equal to zero are not guarded: the quotient follows
/// IEEE 754 (`inf` or `NaN`) and the number of such samples is logged.
pub fn apply_white_reference(
    sample: &mut CubeFloat,
    reference: &CubeFloat,
    factor: f64,
) -> Result<()> {
    if !sample.is_allocated() || !reference.is_allocated() {
        return Err(HsiError::DataNotAllocated);
    }
    if sample.shape() != reference.shape() {
        debug!(
            "White reference shape mismatch: sample {:?}, reference {:?}",
            sample.shape(),
            reference.shape()
        );
        return Err(HsiError::DataNotCompatible);
    }
    if !sample.is_valid() || !reference.is_valid() {
        return Err(HsiError::DataNotValid);
    }
    if !factor.is_finite() || factor <= 0.0 {
        return Err(HsiError::ArgumentInvalid);
    }

    let mut zero_references = 0usize;
    for (value, &white) in sample.data_mut().iter_mut().zip(reference.data()) {
        if white == 0.0 {
            zero_references += 1;
        }
        *value = (f64::from(*value) / f64::from(white) * factor) as f32;
    }

    if zero_references > 0 {
        warn!(
            "White reference has {} zero samples; normalized values there are not finite",
            zero_references
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsi_pipeline::buffers::{BufferAllocator, CubeShape};

    fn cube(allocator: &BufferAllocator, values: &[f32]) -> CubeFloat {
        let shape = CubeShape::new(values.len(), 1, 1);
        let mut cube = allocator
            .allocate_cube_with_shape(shape, &[700.0], "cube")
            .unwrap();
        cube.data_mut().copy_from_slice(values);
        cube.set_valid(true);
        cube
    }

    #[test]
    fn test_divides_by_reference_and_scales() {
        let allocator = BufferAllocator::default();
        let mut sample = cube(&allocator, &[100.0, 50.0, 30.0, 0.0]);
        let reference = cube(&allocator, &[200.0, 100.0, 60.0, 10.0]);

        apply_white_reference(&mut sample, &reference, 0.95).unwrap();

        let expected = [0.475f32, 0.475, 0.475, 0.0];
        for (value, expected) in sample.data().iter().zip(expected) {
            assert!((value - expected).abs() < 1e-6);
        }
        assert!(sample.is_valid());
    }

    #[test]
    fn test_reference_at_factor_is_identity() {
        let allocator = BufferAllocator::default();
        let values = [0.1f32, 0.5, 1.25, 42.0, 0.0];
        let mut sample = cube(&allocator, &values);
        let reference = cube(&allocator, &[0.95; 5]);

        apply_white_reference(&mut sample, &reference, 0.95).unwrap();
        let once: Vec<f32> = sample.data().to_vec();
        apply_white_reference(&mut sample, &reference, 0.95).unwrap();

        for ((value, once), original) in sample.data().iter().zip(&once).zip(values) {
            assert!((once - original).abs() <= original.abs() * 1e-6);
            assert!((value - original).abs() <= original.abs() * 1e-6);
        }
    }

    #[test]
    fn test_unit_reference_scales_by_factor() {
        let allocator = BufferAllocator::default();
        let values = [0.2f32, 0.4, 0.8];
        let mut sample = cube(&allocator, &values);
        let reference = cube(&allocator, &[1.0; 3]);

        apply_white_reference(&mut sample, &reference, 0.95).unwrap();

        for (value, original) in sample.data().iter().zip(values) {
            assert!((value / 0.95 - original).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_reference_is_not_guarded() {
        let allocator = BufferAllocator::default();
        let mut sample = cube(&allocator, &[1.0, 0.0, -1.0]);
        let reference = cube(&allocator, &[0.0, 0.0, 0.0]);

        apply_white_reference(&mut sample, &reference, 0.95).unwrap();

        assert_eq!(sample.data()[0], f32::INFINITY);
        assert!(sample.data()[1].is_nan());
        assert_eq!(sample.data()[2], f32::NEG_INFINITY);
    }

    #[test]
    fn test_shape_mismatch() {
        let allocator = BufferAllocator::default();
        let mut sample = cube(&allocator, &[1.0, 2.0]);
        let reference = cube(&allocator, &[1.0, 2.0, 3.0]);

        assert_eq!(
            apply_white_reference(&mut sample, &reference, 0.95).unwrap_err(),
            HsiError::DataNotCompatible
        );
        assert_eq!(sample.data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_invalid_inputs() {
        let allocator = BufferAllocator::default();
        let mut sample = cube(&allocator, &[1.0, 2.0]);
        let mut reference = cube(&allocator, &[1.0, 2.0]);
        reference.set_valid(false);

        assert_eq!(
            apply_white_reference(&mut sample, &reference, 0.95).unwrap_err(),
            HsiError::DataNotValid
        );

        reference.set_valid(true);
        sample.set_valid(false);
        assert_eq!(
            apply_white_reference(&mut sample, &reference, 0.95).unwrap_err(),
            HsiError::DataNotValid
        );
    }

    #[test]
    fn test_factor_must_be_positive() {
        let allocator = BufferAllocator::default();
        let mut sample = cube(&allocator, &[1.0]);
        let reference = cube(&allocator, &[1.0]);

        for factor in [0.0, -0.95, f64::INFINITY] {
            assert_eq!(
                apply_white_reference(&mut sample, &reference, factor).unwrap_err(),
                HsiError::ArgumentInvalid
            );
        }
    }
}
