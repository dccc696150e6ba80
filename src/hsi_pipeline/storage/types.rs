//! Storage configuration types

/// Container format of saved cubes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CubeFileFormat {
    /// ENVI header plus raw little-endian f32 data (BIL)
    #[default]
    Envi,
    /// Multi-page 32-bit float TIFF, one page per band
    Tiff(TiffCompression),
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    /// LZW compression
    Lzw,
    /// Deflate compression, balanced level
    Deflate,
}
