//! Buffer types shared by the device session, correction and storage.
//!
//! Cubes are stored band-interleaved-by-line (BIL): one scan line holds every
//! band of every column, index `(y * bands + b) * width + x`. The dark
//! reference is a single sensor line, index `b * width + x`.

use crate::hsi_pipeline::buffers::ledger::{Allocation, BufferId};

/// Dimensions of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CubeShape {
    /// Columns per scan line
    pub width: usize,
    /// Number of scan lines
    pub height: usize,
    /// Spectral bands per pixel
    pub bands: usize,
}

impl CubeShape {
    pub fn new(width: usize, height: usize, bands: usize) -> Self {
        Self {
            width,
            height,
            bands,
        }
    }

    /// Samples in one scan line, `None` on overflow.
    pub fn line_len(&self) -> Option<usize> {
        self.width.checked_mul(self.bands)
    }

    /// Total samples, `None` on overflow.
    pub fn sample_count(&self) -> Option<usize> {
        self.line_len()?.checked_mul(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.bands == 0
    }

    /// Shape of one sensor line of this cube.
    pub fn frame_shape(&self) -> FrameShape {
        FrameShape {
            width: self.width,
            bands: self.bands,
        }
    }
}

/// Dimensions of a single sensor line (columns x bands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameShape {
    pub width: usize,
    pub bands: usize,
}

impl FrameShape {
    pub fn sample_count(&self) -> Option<usize> {
        self.width.checked_mul(self.bands)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.bands == 0
    }
}

/// Output cube layout as reported by the device after initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeLayout {
    pub shape: CubeShape,
    /// ADC depth of the sensor (e.g. 10 or 12)
    pub bits_per_sample: u32,
    /// Centre wavelength of every raw band
    pub wavelengths_nm: Vec<f32>,
}

/// Allocated cube layout, required to allocate acquisition cubes.
#[derive(Debug)]
pub struct CubeDataFormat {
    layout: CubeLayout,
    allocation: Allocation,
}

impl CubeDataFormat {
    pub(crate) fn new(layout: CubeLayout, allocation: Allocation) -> Self {
        Self { layout, allocation }
    }

    pub fn shape(&self) -> CubeShape {
        self.layout.shape
    }

    pub fn bits_per_sample(&self) -> u32 {
        self.layout.bits_per_sample
    }

    pub fn wavelengths_nm(&self) -> &[f32] {
        &self.layout.wavelengths_nm
    }

    pub fn layout(&self) -> &CubeLayout {
        &self.layout
    }

    pub fn buffer_id(&self) -> BufferId {
        self.allocation.id()
    }
}

/// Spectral correction coefficients as delivered by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionCoefficients {
    pub raw_bands: usize,
    pub corrected_bands: usize,
    /// Row-major `corrected_bands x raw_bands`
    pub coefficients: Vec<f32>,
    /// Centre wavelength of every corrected band
    pub wavelengths_nm: Vec<f32>,
}

impl CorrectionCoefficients {
    pub fn is_consistent(&self) -> bool {
        self.raw_bands > 0
            && self.corrected_bands > 0
            && self.raw_bands.checked_mul(self.corrected_bands) == Some(self.coefficients.len())
            && self.wavelengths_nm.len() == self.corrected_bands
    }
}

#[derive(Debug)]
pub struct CorrectionMatrix {
    coefficients: CorrectionCoefficients,
    valid: bool,
    allocation: Allocation,
}

impl CorrectionMatrix {
    pub(crate) fn new(coefficients: CorrectionCoefficients, allocation: Allocation) -> Self {
        Self {
            coefficients,
            valid: true,
            allocation,
        }
    }

    pub fn raw_bands(&self) -> usize {
        self.coefficients.raw_bands
    }

    pub fn corrected_bands(&self) -> usize {
        self.coefficients.corrected_bands
    }

    /// Coefficients producing corrected band `band`, one per raw band.
    pub fn row(&self, band: usize) -> &[f32] {
        let start = band * self.coefficients.raw_bands;
        &self.coefficients.coefficients[start..start + self.coefficients.raw_bands]
    }

    pub fn wavelengths_nm(&self) -> &[f32] {
        &self.coefficients.wavelengths_nm
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn buffer_id(&self) -> BufferId {
        self.allocation.id()
    }
}

/// Single floating point sensor line (dark reference).
#[derive(Debug)]
pub struct FrameFloat {
    shape: FrameShape,
    data: Vec<f32>,
    valid: bool,
    allocation: Option<Allocation>,
}

impl FrameFloat {
    pub(crate) fn new(shape: FrameShape, data: Vec<f32>, allocation: Allocation) -> Self {
        Self {
            shape,
            data,
            valid: false,
            allocation: Some(allocation),
        }
    }

    pub fn unallocated() -> Self {
        Self {
            shape: FrameShape::default(),
            data: Vec::new(),
            valid: false,
            allocation: None,
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    pub fn buffer_id(&self) -> Option<BufferId> {
        self.allocation.as_ref().map(Allocation::id)
    }
}

/// Floating point hyperspectral cube in BIL order.
#[derive(Debug)]
pub struct CubeFloat {
    shape: CubeShape,
    data: Vec<f32>,
    wavelengths_nm: Vec<f32>,
    valid: bool,
    allocation: Option<Allocation>,
}

impl CubeFloat {
    pub(crate) fn new(
        shape: CubeShape,
        data: Vec<f32>,
        wavelengths_nm: Vec<f32>,
        allocation: Allocation,
    ) -> Self {
        Self {
            shape,
            data,
            wavelengths_nm,
            valid: false,
            allocation: Some(allocation),
        }
    }

    /// A destination that was never allocated.
    pub fn unallocated() -> Self {
        Self {
            shape: CubeShape::default(),
            data: Vec::new(),
            wavelengths_nm: Vec::new(),
            valid: false,
            allocation: None,
        }
    }

    pub fn shape(&self) -> CubeShape {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Samples of band `band` on scan line `line`.
    pub fn band_row(&self, line: usize, band: usize) -> &[f32] {
        let start = (line * self.shape.bands + band) * self.shape.width;
        &self.data[start..start + self.shape.width]
    }

    pub fn sample(&self, x: usize, y: usize, band: usize) -> f32 {
        self.data[(y * self.shape.bands + band) * self.shape.width + x]
    }

    pub fn wavelengths_nm(&self) -> &[f32] {
        &self.wavelengths_nm
    }

    pub(crate) fn set_wavelengths_nm(&mut self, wavelengths_nm: &[f32]) {
        self.wavelengths_nm.clear();
        self.wavelengths_nm.extend_from_slice(wavelengths_nm);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    pub fn buffer_id(&self) -> Option<BufferId> {
        self.allocation.as_ref().map(Allocation::id)
    }
}
