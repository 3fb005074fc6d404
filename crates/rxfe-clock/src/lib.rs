//! # rxfe-clock
//!
//! Sample-clock synthesis for the rxfe capture front-end.
//!
//! The ADC sample clock comes from a Si5351-class generator on CLK0, driven
//! from PLL A. This crate provides:
//! - [`ClockParameters`] - divider chain planning (pure, no I/O)
//! - [`registers`] - the register map and `P1`/`P2`/`P3` block encoding
//! - [`ClockSynth`] - programming sequence, enable tracking and live lock
//!   queries over a [`RegisterBus`](rxfe_hal::RegisterBus)
//!
//! ## Programming Sequence
//!
//! 1. Plan the divider chain; out-of-range targets fail before any write
//! 2. Write the PLL A block, then the multisynth 0 block with the R divider
//! 3. Reset the PLLs
//! 4. Enable CLK0 from PLL A
//!
//! The first failed write aborts the sequence, counts a bus failure in the
//! shared [`StreamCounters`](rxfe_atomic::StreamCounters) and leaves the
//! output disabled.
//!
//! ## Example
//!
//! ```rust
//! use rxfe_clock::ClockParameters;
//!
//! let params = ClockParameters::compute(1_000_000, 27_000_000)?;
//! let actual = params.effective_frequency_hz(27_000_000);
//! assert!((actual - 1_000_000.0).abs() < 0.01);
//! # Ok::<(), rxfe_clock::SynthesisError>(())
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod params;
pub mod prelude;
pub mod registers;
pub mod synth;

pub use error::{SynthesisError, SynthesisResult};
pub use params::{ClockParameters, DEFAULT_CRYSTAL_HZ};
pub use registers::{
    OutputDivider, PllRatio, decode_multisynth_registers, decode_pll_registers,
    encode_multisynth_registers, encode_pll_registers,
};
pub use synth::{ClockHealth, ClockSynth, SynthConfig};
