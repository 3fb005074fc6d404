//! # rxfe-hal
//!
//! Hardware facade for the rxfe capture front-end.
//!
//! This crate defines the narrow contract the streaming control plane needs
//! from the device:
//! - [`CaptureEngine`] - parallel-capture state machine, DMA transfer and
//!   USB data endpoint
//! - [`RegisterBus`] - register access to the external clock generator
//! - [`SimulatedFrontend`] - software implementation for tests and
//!   hardware-free environments (feature `sim`, on by default)
//!
//! ## Concurrency
//!
//! All facade methods take `&self` and are synchronous and bounded, so a
//! single device handle can be shared behind an `Arc` between the command
//! dispatcher and the watchdog thread.
//!
//! ## Example
//!
//! ```rust
//! use rxfe_hal::prelude::*;
//!
//! let sim = SimulatedFrontend::new();
//! sim.write(177, 0xA0).expect("PLL reset");
//! let status = sim.read(0).expect("status");
//! assert_eq!(status & 0x20, 0);
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

pub mod bus;
pub mod capture;
pub mod error;
pub mod prelude;

#[cfg(feature = "sim")]
#[cfg_attr(docsrs, doc(cfg(feature = "sim")))]
pub mod sim;

pub use bus::RegisterBus;
pub use capture::{CaptureEngine, CaptureState};
pub use error::{BusError, HalError, HalResult};

#[cfg(feature = "sim")]
pub use sim::{HalCall, HalOp, SimulatedFrontend};
