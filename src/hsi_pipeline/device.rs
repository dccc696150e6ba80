//! Camera device module
//!
//! The driver contract for the line-scan camera, a deterministic simulated
//! device, and the session that enforces the legal order of device calls.

mod driver;
mod session;
mod simulated_driver;
pub mod types;


pub use driver::DeviceDriver;
pub use session::DeviceSession;
pub use simulated_driver::{Scene, SimulatedSnapscan, WHITE_TARGET_REFLECTANCE};
pub use types::{
    ConfigurationParameters, DeviceHandle, DeviceState, RuntimeParameters, SystemProperties,
};
