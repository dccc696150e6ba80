//! Radiometric correction module
//!
//! Spectral correction of raw cubes and normalization against a white
//! reference.

mod pipeline;
mod spectral;
mod white_reference;

pub use pipeline::{CorrectionPipeline, DEFAULT_WHITE_REFERENCE_FACTOR};
pub use spectral::apply_spectral_correction;
pub use white_reference::apply_white_reference;
