//! Common utilities module
//!
//! This module contains the status taxonomy shared by every pipeline stage.

pub mod error;

pub use error::{AcquisitionError, CallContext, CallError, HsiError, Result, Stage};
