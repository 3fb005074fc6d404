//! Prelude for rxfe-clock.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::error::{SynthesisError, SynthesisResult};
pub use crate::params::ClockParameters;
pub use crate::synth::{ClockHealth, ClockSynth, SynthConfig};
