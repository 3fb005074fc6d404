//! # rxfe-stream
//!
//! Streaming control plane for the rxfe capture front-end.
//!
//! This crate turns the hardware facade from `rxfe-hal` and the clock driver
//! from `rxfe-clock` into a gap-free capture stream that recovers from
//! silent wedges:
//!
//! - [`preflight`] - refuses a start unless the sample clock is enabled and
//!   locked
//! - [`StreamController`] - start, stop, flush and recovery sequencing
//! - [`StallWatchdog`] / [`WatchdogRunner`] - stall detection on a fixed
//!   period
//! - [`diagnostics`] - side-effect-free snapshot with a 20-byte wire form
//! - [`Frontend`] - host command routing and hardware event entry points
//! - [`FrontendConfig`] - serde-backed configuration with validation
//!
//! ## Concurrency
//!
//! Hardware event callbacks only touch relaxed atomics and never block. The
//! command path and the watchdog thread serialize their hardware sequences
//! through the controller's mutex; the pipeline state is readable without
//! it.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rxfe_hal::SimulatedFrontend;
//! use rxfe_stream::prelude::*;
//!
//! let device = Arc::new(SimulatedFrontend::new());
//! let frontend = Frontend::new(device.clone(), device, FrontendConfig::default())?;
//!
//! frontend.set_clock_frequency(64_000_000)?;
//! frontend.begin_streaming()?;
//! frontend.on_buffer_complete();
//!
//! let diag = frontend.diagnostics();
//! assert_eq!(diag.pipeline_state, PipelineState::Streaming);
//! assert_eq!(diag.record.buffer_completions, 1);
//!
//! frontend.end_streaming()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
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

pub mod command;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod frontend;
pub mod preflight;
pub mod prelude;
pub mod state;
pub mod watchdog;

pub use command::{Command, RejectReason, Response};
pub use config::{FrontendConfig, FrontendConfigBuilder, TransferConfig, WatchdogConfig};
pub use controller::{RecoveryOutcome, StreamController};
pub use diagnostics::{DiagnosticsRecord, DiagnosticsSnapshot, RECORD_LEN};
pub use error::{
    CommandError, ConfigError, FlushError, FrontendError, FrontendResult, PreflightError,
    StartError, StopError,
};
pub use frontend::Frontend;
pub use state::{PipelineState, PipelineStateCell};
pub use watchdog::{StallWatchdog, TickOutcome, WatchdogRunner};
