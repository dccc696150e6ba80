use snapscan_capture_rs::hsi_pipeline::{
    AcquisitionConfig, AcquisitionError, AcquisitionPipeline, Stage,
};
use snapscan_capture_rs::logger;

use tracing::{error, info};

/// Process status for any failed stage.
const FAILURE_EXIT_CODE: i32 = -1;

fn main() {
    let config = AcquisitionConfig::default();
    if let Err(error) = logger::init(&config.log_dir, config.log_level) {
        let failure = AcquisitionError {
            stage: Stage::Init,
            error,
        };
        println!("{failure}");
        std::process::exit(FAILURE_EXIT_CODE);
    }

    info!("Starting snapscan_capture...");
    info!(
        "Device: {}, resolution {}x{}, integration time {} ms",
        config.device_config_path.display(),
        config.resolution.0,
        config.resolution.1,
        config.integration_time_ms
    );

    let mut pipeline = AcquisitionPipeline::new(config);
    if let Err(e) = pipeline.run() {
        println!("{e}");
        error!("Acquisition aborted: {}", e);
        // Release buffers and close the device before exiting.
        drop(pipeline);
        std::process::exit(FAILURE_EXIT_CODE);
    }

    info!("Acquisition successful!");
}
