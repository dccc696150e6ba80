pub mod hsi_pipeline;
pub mod logger;
