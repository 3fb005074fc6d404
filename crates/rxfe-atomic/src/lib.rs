//! # rxfe-atomic
//!
//! Lock-free counters shared between the hardware callback context and the
//! polling context of the rxfe streaming control plane.
//!
//! ## Safety Guarantees
//!
//! - **No heap allocations** after initialization
//! - **No blocking operations** - every method is a single atomic operation
//!   or a short bounded sequence of them
//! - **Session-tagged buffer counting** - completions only count against the
//!   session they observed
//! - **Fixed-width 32-bit atomics** via `portable-atomic`, so the counters are
//!   lock-free on targets without native 32-bit RMW instructions as well
//!
//! ## Usage
//!
//! ```rust
//! use rxfe_atomic::StreamCounters;
//!
//! let counters = StreamCounters::new();
//! counters.begin_buffer_session();
//!
//! // Callback context
//! counters.inc_buffer_complete();
//! counters.record_pib_error(0x1005);
//!
//! // Polling context
//! let snapshot = counters.snapshot();
//! assert_eq!(snapshot.buffer_completions, 1);
//! assert_eq!(snapshot.last_pib_error, 0x1005);
//! ```

#![no_std]
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

pub mod counters;
pub mod prelude;

pub use counters::{BufferSession, CounterSnapshot, StreamCounters};
