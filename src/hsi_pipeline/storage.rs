//! Cube storage module
//!
//! Serializers that persist corrected cubes to disk.

mod envi_writer;
mod tiff_writer;
pub mod types;
mod writer;

pub use envi_writer::EnviWriter;
pub use tiff_writer::TiffCubeWriter;
pub use types::{CubeFileFormat, TiffCompression};
pub use writer::{CubeWriter, writer_for};
