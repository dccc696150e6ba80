use std::fmt;

use thiserror::Error;

/// Non-Ok status reported by the device, the allocator or a correction call.
///
/// Messages are the fixed texts of the camera SDK so diagnostics read the
/// same as the vendor tooling.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HsiError {
    #[error("Invalid device handle specified.")]
    HandleInvalid,

    #[error("Invalid argument provided in function call.")]
    ArgumentInvalid,

    #[error("Function call illegal given the current snapscan state.")]
    CallIllegal,

    #[error("A file could not be found.")]
    FileNotFound,

    #[error("Sensor calibration file could not be found.")]
    CalibrationFileNotFound,

    #[error("Snapscan system could not be connected.")]
    ConnectionFailed,

    #[error("Allocation of resources failed.")]
    AllocationError,

    #[error("Unable to fulfill acquisition.")]
    AcquisitionFailed,

    #[error("Provided data structure is not allocated.")]
    DataNotAllocated,

    #[error("Data with valid flag false provided as input for operation.")]
    DataNotValid,

    #[error("Data provided is not compatible.")]
    DataNotCompatible,

    #[error("Specified directory doesn't exist and could not be created.")]
    FileSystemError,

    #[error("Could not read or write data from the filesystem.")]
    FileIoError,

    #[error("An unexpected internal error occurred.")]
    InternalError,
}

pub type Result<T> = std::result::Result<T, HsiError>;

/// A failed collaborator call, tagged with the name of the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error calling {call}: {source}")]
pub struct CallError {
    pub call: &'static str,
    #[source]
    pub source: HsiError,
}

pub trait CallContext<T> {
    fn call(self, name: &'static str) -> std::result::Result<T, CallError>;
}

impl<T> CallContext<T> for Result<T> {
    fn call(self, name: &'static str) -> std::result::Result<T, CallError> {
        self.map_err(|source| CallError { call: name, source })
    }
}

/// Steps of the acquisition sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    CameraStart,
    GetWhiteBalance,
    CameraScan,
    SaveImage,
    CameraEnd,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Init => "Init",
            Stage::CameraStart => "CameraStart",
            Stage::GetWhiteBalance => "GetWhiteBalance",
            Stage::CameraScan => "CameraScan",
            Stage::SaveImage => "SaveImage",
            Stage::CameraEnd => "CameraEnd",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First failure of an acquisition run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed: {error}")]
pub struct AcquisitionError {
    pub stage: Stage,
    #[source]
    pub error: CallError,
}

impl AcquisitionError {
    /// Status code that ended the run.
    pub fn status(&self) -> HsiError {
        self.error.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_message() {
        let result: Result<()> = Err(HsiError::FileNotFound);
        let err = result.call("OpenDevice").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error calling OpenDevice: A file could not be found."
        );
    }

    #[test]
    fn test_acquisition_error_reports_stage_and_status() {
        let err = AcquisitionError {
            stage: Stage::CameraScan,
            error: CallError {
                call: "AcquireCube (cube)",
                source: HsiError::AcquisitionFailed,
            },
        };
        assert_eq!(err.status(), HsiError::AcquisitionFailed);
        assert_eq!(
            err.to_string(),
            "CameraScan failed: Error calling AcquireCube (cube): Unable to fulfill acquisition."
        );
    }
}
