use tracing::{error, info, info_span};

use crate::hsi_pipeline::acquisition::{
    AcquisitionConfig, OperatorConsole, REFERENCE_CUBE_NAME, SAMPLE_CUBE_NAME, ScanPosition,
    StageTimings, StdinConsole, Timer,
};
use crate::hsi_pipeline::buffers::{
    BufferAllocator, CorrectionMatrix, CubeDataFormat, CubeFloat, FrameFloat, ResourceLedger,
};
use crate::hsi_pipeline::common::{AcquisitionError, CallContext, CallError, HsiError, Stage};
use crate::hsi_pipeline::correction::CorrectionPipeline;
use crate::hsi_pipeline::device::{DeviceDriver, DeviceSession, DeviceState, SimulatedSnapscan};
use crate::hsi_pipeline::storage::{CubeWriter, writer_for};

const WHITE_REFERENCE_PROMPT: &str = "Place the white reference tile under the camera.";
const SAMPLE_PROMPT: &str = "Place the sample under the camera.";

type CallResult<T = ()> = std::result::Result<T, CallError>;

/// Buffers that live across stages. Each slot is released when it is
/// cleared, replaced, or when the pipeline is dropped.
#[derive(Debug, Default)]
pub struct SessionBuffers {
    pub cube_corrected: Option<CubeFloat>,
    pub reference_corrected: Option<CubeFloat>,
    pub dark_reference: Option<FrameFloat>,
    pub cube_format: Option<CubeDataFormat>,
    pub correction_matrix: Option<CorrectionMatrix>,
}

fn required<'a, T>(slot: &'a Option<T>, call: &'static str) -> CallResult<&'a T> {
    slot.as_ref().ok_or(CallError {
        call,
        source: HsiError::DataNotAllocated,
    })
}

// The dark reference only exists once the device has been started.
fn dark_reference<'a>(
    slot: &'a Option<FrameFloat>,
    call: &'static str,
) -> CallResult<&'a FrameFloat> {
    slot.as_ref().ok_or(CallError {
        call,
        source: HsiError::CallIllegal,
    })
}

fn release<T>(slot: &mut Option<T>, call: &'static str) -> CallResult {
    slot.take().map(drop).ok_or(CallError {
        call,
        source: HsiError::DataNotAllocated,
    })
}

/// Runs the capture sequence against a device driver:
/// Init, CameraStart, GetWhiteBalance, CameraScan, SaveImage and CameraEnd.
pub struct AcquisitionPipeline<D: DeviceDriver, C: OperatorConsole> {
    // Declared first so buffers are released before the device closes.
    buffers: SessionBuffers,
    session: DeviceSession<D>,
    corrector: CorrectionPipeline,
    writer: Box<dyn CubeWriter>,
    console: C,
    config: AcquisitionConfig,
    ledger: ResourceLedger,
    timings: StageTimings,
}

impl AcquisitionPipeline<SimulatedSnapscan, StdinConsole> {
    pub fn new(config: AcquisitionConfig) -> Self {
        let writer = writer_for(config.file_format);
        Self::with_custom(SimulatedSnapscan::new(), writer, StdinConsole, config)
    }
}

impl<D: DeviceDriver, C: OperatorConsole> AcquisitionPipeline<D, C> {
    pub fn with_custom(
        driver: D,
        writer: Box<dyn CubeWriter>,
        console: C,
        config: AcquisitionConfig,
    ) -> Self {
        let ledger = ResourceLedger::new();
        let allocator = BufferAllocator::new(ledger.clone());
        Self {
            buffers: SessionBuffers::default(),
            session: DeviceSession::new(driver, allocator.clone()),
            corrector: CorrectionPipeline::new(allocator, config.white_reference_factor),
            writer,
            console,
            config,
            ledger,
            timings: StageTimings::new(),
        }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn session(&self) -> &DeviceSession<D> {
        &self.session
    }

    pub fn buffers(&self) -> &SessionBuffers {
        &self.buffers
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    /// Runs every stage in order and stops at the first failure.
    ///
    /// Buffers still held after a failure are released when the pipeline is
    /// dropped, and the device is stopped and closed with it.
    pub fn run(&mut self) -> Result<(), AcquisitionError> {
        info!("Starting acquisition");

        self.stage(Stage::Init, Self::init)?;
        self.stage(Stage::CameraStart, Self::camera_start)?;

        self.console.confirm(WHITE_REFERENCE_PROMPT);
        self.console.notify("Acquiring white reference...");
        self.stage(Stage::GetWhiteBalance, Self::get_white_balance)?;

        self.console.confirm(SAMPLE_PROMPT);
        self.console.notify("Scanning sample...");
        for position in self.config.scan_plan {
            self.stage(Stage::CameraScan, |pipeline| pipeline.camera_scan(position))?;
        }

        self.stage(Stage::SaveImage, Self::save_image)?;
        self.console.notify("Image saved.");

        self.stage(Stage::CameraEnd, Self::camera_end)?;

        info!(
            "Acquisition complete in {:.3}ms",
            self.timings.total_duration().as_secs_f64() * 1000.0
        );
        self.timings.log_summary();
        Ok(())
    }

    fn stage<F>(&mut self, stage: Stage, f: F) -> Result<(), AcquisitionError>
    where
        F: FnOnce(&mut Self) -> CallResult,
    {
        let _span = info_span!("stage", name = stage.name()).entered();
        let timer = Timer::start(stage);
        let result = f(self);
        let (stage, duration) = timer.stop();
        self.timings.add_stage(stage, duration);

        result.map_err(|error| {
            error!("{}", error);
            AcquisitionError { stage, error }
        })
    }

    /// Opens and configures the device and fetches the cube data format.
    pub fn init(&mut self) -> CallResult {
        let config_path = self.config.device_config_path.clone();
        let handle = self.session.open(&config_path).call("OpenDevice")?;

        let system = self
            .session
            .system_properties()
            .call("GetSystemProperties")?;
        info!(
            "Opened {} (serial {}) as {}",
            system.model, system.serial_number, handle
        );
        self.session
            .configuration_parameters()
            .call("GetConfigurationParameters")?;
        self.session
            .runtime_parameters()
            .call("GetRuntimeParameters")?;

        let (width, height) = self.config.resolution;
        self.session
            .set_configuration_parameters(width, height)
            .call("SetConfigurationParameters")?;
        let format = self.session.initialize().call("Initialize")?;
        self.buffers.cube_format = Some(format);

        self.session
            .set_runtime_parameters(self.config.integration_time_ms)
            .call("SetRuntimeParameters")?;
        Ok(())
    }

    /// Starts acquisition and keeps the dark reference and correction matrix.
    pub fn camera_start(&mut self) -> CallResult {
        let (dark_reference, correction_matrix) = self.session.start().call("Start")?;
        self.buffers.dark_reference = Some(dark_reference);
        self.buffers.correction_matrix = Some(correction_matrix);
        Ok(())
    }

    /// Scans the white tile, corrects it and saves it as the reference cube.
    pub fn get_white_balance(&mut self) -> CallResult {
        let call = "AcquireCube (reference)";
        let dark = dark_reference(&self.buffers.dark_reference, call)?;
        let matrix = required(&self.buffers.correction_matrix, "AllocateCubeCorrected")?;
        let format = required(&self.buffers.cube_format, "AllocateCubeCorrected")?;

        let raw = self.session.acquire_cube(dark, "reference").call(call)?;
        let mut reference = self
            .corrector
            .allocate_corrected(matrix, format, REFERENCE_CUBE_NAME)
            .call("AllocateCubeCorrected")?;
        self.corrector
            .apply_spectral_correction(&mut reference, &raw, matrix)
            .call("ApplySpectralCorrection")?;
        self.writer
            .write_cube(&reference, &self.config.output_dir, REFERENCE_CUBE_NAME)
            .call("SaveCube (reference)")?;
        drop(raw);

        self.buffers.reference_corrected = Some(reference);
        Ok(())
    }

    /// Scans the sample at `position`, then corrects and normalizes it.
    pub fn camera_scan(&mut self, position: ScanPosition) -> CallResult {
        let call = "AcquireCube (cube)";
        let dark = dark_reference(&self.buffers.dark_reference, call)?;
        let matrix = required(&self.buffers.correction_matrix, "AllocateCubeCorrected")?;
        let format = required(&self.buffers.cube_format, "AllocateCubeCorrected")?;
        let reference = required(&self.buffers.reference_corrected, "ApplyWhiteReference")?;

        info!("Scanning position {}", position.index);
        let raw = self.session.acquire_cube(dark, "cube").call(call)?;

        // The previous position's result is replaced, not accumulated.
        self.buffers.cube_corrected = None;
        let mut corrected = self
            .corrector
            .allocate_corrected(matrix, format, SAMPLE_CUBE_NAME)
            .call("AllocateCubeCorrected")?;
        self.corrector
            .apply_spectral_correction(&mut corrected, &raw, matrix)
            .call("ApplySpectralCorrection")?;
        self.corrector
            .apply_white_reference(&mut corrected, reference)
            .call("ApplyWhiteReference")?;
        drop(raw);

        self.buffers.cube_corrected = Some(corrected);
        Ok(())
    }

    pub fn save_image(&mut self) -> CallResult {
        let call = "SaveCube (cube)";
        let cube = required(&self.buffers.cube_corrected, call)?;
        let path = self
            .writer
            .write_cube(cube, &self.config.output_dir, SAMPLE_CUBE_NAME)
            .call(call)?;
        info!("Sample cube saved to {}", path.display());
        Ok(())
    }

    /// Releases the session buffers, then stops and closes the device.
    pub fn camera_end(&mut self) -> CallResult {
        release(&mut self.buffers.cube_corrected, "DeallocateCube (cube_corrected)")?;
        release(
            &mut self.buffers.reference_corrected,
            "DeallocateCube (reference_corrected)",
        )?;
        release(&mut self.buffers.dark_reference, "DeallocateFrame (dark_reference)")?;
        release(&mut self.buffers.cube_format, "DeallocateCubeDataFormat")?;
        release(&mut self.buffers.correction_matrix, "DeallocateCorrectionMatrix")?;

        if self.session.state() == DeviceState::Started {
            self.session.stop().call("Stop")?;
        }
        self.session.close().call("CloseDevice")?;
        Ok(())
    }
}
