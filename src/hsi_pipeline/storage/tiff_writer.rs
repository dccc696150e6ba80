use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use tiff::encoder::{TiffEncoder, TiffKind};
use tracing::{debug, instrument};

use crate::hsi_pipeline::buffers::CubeFloat;
use crate::hsi_pipeline::common::error::Result;
use crate::hsi_pipeline::storage::types::TiffCompression;
use crate::hsi_pipeline::storage::writer::{CubeWriter, io_failure, prepare_output};

/// Classic TIFF addresses its contents with 32-bit offsets.
const CLASSIC_TIFF_LIMIT: u64 = u32::MAX as u64;

/// Room left for tags and directories below the classic limit.
const CLASSIC_TIFF_HEADROOM: u64 = 64 * 1024 * 1024;

/// Writes `<name>.tiff` with one 32-bit float page per band.
///
/// Cubes whose sample data comes close to the 4 GiB classic TIFF limit are
/// written as BigTIFF (64-bit offsets); smaller cubes stay classic TIFF.
#[derive(Debug, Clone, Copy)]
pub struct TiffCubeWriter {
    compression: TiffCompression,
    bigtiff_threshold: u64,
}

impl Default for TiffCubeWriter {
    fn default() -> Self {
        Self::new(TiffCompression::default())
    }
}

impl TiffCubeWriter {
    pub fn new(compression: TiffCompression) -> Self {
        Self {
            compression,
            bigtiff_threshold: CLASSIC_TIFF_LIMIT - CLASSIC_TIFF_HEADROOM,
        }
    }

    /// Sample data size in bytes from which BigTIFF is written.
    pub fn with_bigtiff_threshold(mut self, bytes: u64) -> Self {
        self.bigtiff_threshold = bytes;
        self
    }

    fn needs_bigtiff(&self, data_bytes: u64) -> bool {
        data_bytes >= self.bigtiff_threshold
    }

    fn compression(&self) -> tiff::encoder::Compression {
        match self.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::Deflate => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Balanced,
            ),
        }
    }
}

fn write_band_pages<W: Write + Seek, K: TiffKind>(
    mut encoder: TiffEncoder<W, K>,
    cube: &CubeFloat,
    path: &Path,
) -> Result<()> {
    let shape = cube.shape();
    let mut plane = Vec::with_capacity(shape.width * shape.height);
    for band in 0..shape.bands {
        plane.clear();
        for line in 0..shape.height {
            plane.extend_from_slice(cube.band_row(line, band));
        }
        encoder
            .write_image::<tiff::encoder::colortype::Gray32Float>(
                shape.width as u32,
                shape.height as u32,
                &plane,
            )
            .map_err(|e| io_failure(path, e))?;
    }
    Ok(())
}

impl CubeWriter for TiffCubeWriter {
    #[instrument(skip(self, cube, dir))]
    fn write_cube(&self, cube: &CubeFloat, dir: &Path, name: &str) -> Result<PathBuf> {
        prepare_output(cube, dir)?;

        let shape = cube.shape();
        let path = dir.join(format!("{name}.tiff"));
        let data_bytes = (cube.data().len() as u64).saturating_mul(4);
        let big = self.needs_bigtiff(data_bytes);
        debug!(
            "Encoding TIFF cube: {}x{}x{} ({:?}, bigtiff: {})",
            shape.width, shape.height, shape.bands, self.compression, big
        );

        let mut buffer = Vec::new();
        let output = Cursor::new(&mut buffer);
        if big {
            let encoder = TiffEncoder::new_big(output)
                .map_err(|e| io_failure(&path, e))?
                .with_compression(self.compression());
            write_band_pages(encoder, cube, &path)?;
        } else {
            let encoder = TiffEncoder::new(output)
                .map_err(|e| io_failure(&path, e))?
                .with_compression(self.compression());
            write_band_pages(encoder, cube, &path)?;
        }

        std::fs::write(&path, &buffer).map_err(|e| io_failure(&path, e))?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    use crate::hsi_pipeline::buffers::{BufferAllocator, CubeShape};

    #[test]
    fn test_one_page_per_band() {
        let dir = tempfile::tempdir().unwrap();
        let allocator = BufferAllocator::default();
        let mut cube = allocator
            .allocate_cube_with_shape(CubeShape::new(4, 3, 2), &[500.0, 600.0], "cube")
            .unwrap();
        for (i, value) in cube.data_mut().iter_mut().enumerate() {
            *value = i as f32;
        }
        cube.set_valid(true);

        let writer = TiffCubeWriter::new(TiffCompression::Deflate);
        let path = writer.write_cube(&cube, dir.path(), "cube_corrected").unwrap();
        assert_eq!(path, dir.path().join("cube_corrected.tiff"));

        let mut decoder = tiff::decoder::Decoder::new(File::open(&path).unwrap()).unwrap();
        for band in 0..2 {
            if band > 0 {
                assert!(decoder.more_images());
                decoder.next_image().unwrap();
            }
            assert_eq!(decoder.dimensions().unwrap(), (4, 3));
            let tiff::decoder::DecodingResult::F32(page) = decoder.read_image().unwrap() else {
                panic!("expected 32-bit float samples");
            };
            let expected: Vec<f32> = (0..3)
                .flat_map(|line| cube.band_row(line, band).to_vec())
                .collect();
            assert_eq!(page, expected);
        }
        assert!(!decoder.more_images());
    }

    #[test]
    fn test_large_cubes_switch_to_bigtiff() {
        let writer = TiffCubeWriter::new(TiffCompression::None);
        assert!(!writer.needs_bigtiff(2048 * 1088 * 12 * 4));
        assert!(writer.needs_bigtiff(u32::MAX as u64));
        assert!(writer.needs_bigtiff(8 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_bigtiff_pages_are_readable() {
        let dir = tempfile::tempdir().unwrap();
        let allocator = BufferAllocator::default();
        let mut cube = allocator
            .allocate_cube_with_shape(CubeShape::new(5, 2, 3), &[500.0, 600.0, 700.0], "cube")
            .unwrap();
        for (i, value) in cube.data_mut().iter_mut().enumerate() {
            *value = i as f32 * 0.25;
        }
        cube.set_valid(true);

        let writer = TiffCubeWriter::new(TiffCompression::Lzw).with_bigtiff_threshold(0);
        let path = writer.write_cube(&cube, dir.path(), "cube_corrected").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // little-endian BigTIFF magic is 43
        assert_eq!(&bytes[..4], &[b'I', b'I', 43, 0]);

        let mut decoder = tiff::decoder::Decoder::new(File::open(&path).unwrap()).unwrap();
        for band in 0..3 {
            if band > 0 {
                decoder.next_image().unwrap();
            }
            let tiff::decoder::DecodingResult::F32(page) = decoder.read_image().unwrap() else {
                panic!("expected 32-bit float samples");
            };
            let expected: Vec<f32> = (0..2)
                .flat_map(|line| cube.band_row(line, band).to_vec())
                .collect();
            assert_eq!(page, expected);
        }
        assert!(!decoder.more_images());
    }
}
