//! Prelude for rxfe-hal.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::bus::RegisterBus;
pub use crate::capture::{CaptureEngine, CaptureState};
pub use crate::error::{BusError, HalError, HalResult};

#[cfg(feature = "sim")]
pub use crate::sim::{HalCall, HalOp, SimulatedFrontend};
