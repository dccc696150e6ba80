//! Image buffer module
//!
//! Cubes, frames, cube formats and correction matrices, plus the ledger that
//! pairs every allocation with exactly one release.

mod allocator;
mod ledger;
pub mod types;

pub use allocator::BufferAllocator;
pub use ledger::{Allocation, BufferId, BufferKind, LedgerEntry, ResourceLedger};
pub use types::{
    CorrectionCoefficients, CorrectionMatrix, CubeDataFormat, CubeFloat, CubeLayout, CubeShape,
    FrameFloat, FrameShape,
};
