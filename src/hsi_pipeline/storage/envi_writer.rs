use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::hsi_pipeline::buffers::CubeFloat;
use crate::hsi_pipeline::common::error::Result;
use crate::hsi_pipeline::storage::writer::{CubeWriter, io_failure, prepare_output};

/// ENVI code for 32-bit IEEE float samples.
const ENVI_DATA_TYPE_F32: u32 = 4;

/// ENVI byte order code for little endian.
const ENVI_BYTE_ORDER_LE: u32 = 0;

/// Writes `<name>.hdr` and `<name>.raw` in ENVI Standard layout (BIL).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnviWriter;

impl EnviWriter {
    fn header(cube: &CubeFloat, name: &str) -> String {
        let shape = cube.shape();
        let mut header = String::from("ENVI\n");
        // Writing into a String cannot fail.
        let _ = writeln!(header, "description = {{{name}}}");
        let _ = writeln!(header, "samples = {}", shape.width);
        let _ = writeln!(header, "lines = {}", shape.height);
        let _ = writeln!(header, "bands = {}", shape.bands);
        let _ = writeln!(header, "header offset = 0");
        let _ = writeln!(header, "file type = ENVI Standard");
        let _ = writeln!(header, "data type = {ENVI_DATA_TYPE_F32}");
        let _ = writeln!(header, "interleave = bil");
        let _ = writeln!(header, "byte order = {ENVI_BYTE_ORDER_LE}");

        if cube.wavelengths_nm().len() == shape.bands {
            let wavelengths: Vec<String> = cube
                .wavelengths_nm()
                .iter()
                .map(|w| format!("{w:.6}"))
                .collect();
            let _ = writeln!(header, "wavelength units = Nanometers");
            let _ = writeln!(header, "wavelength = {{{}}}", wavelengths.join(", "));
        }
        header
    }
}

impl CubeWriter for EnviWriter {
    #[instrument(skip(self, cube, dir))]
    fn write_cube(&self, cube: &CubeFloat, dir: &Path, name: &str) -> Result<PathBuf> {
        prepare_output(cube, dir)?;

        let header_path = dir.join(format!("{name}.hdr"));
        let data_path = dir.join(format!("{name}.raw"));

        std::fs::write(&header_path, Self::header(cube, name))
            .map_err(|e| io_failure(&header_path, e))?;

        let mut output = File::create(&data_path).map_err(|e| io_failure(&data_path, e))?;
        let shape = cube.shape();
        let line_len = shape.width * shape.bands;
        let mut bytes = Vec::with_capacity(line_len * std::mem::size_of::<f32>());
        for line in cube.data().chunks_exact(line_len) {
            bytes.clear();
            for value in line {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            output
                .write_all(&bytes)
                .map_err(|e| io_failure(&data_path, e))?;
        }

        debug!(
            "ENVI cube written: {} ({} bytes)",
            header_path.display(),
            cube.data().len() * std::mem::size_of::<f32>()
        );
        Ok(header_path)
    }
}
