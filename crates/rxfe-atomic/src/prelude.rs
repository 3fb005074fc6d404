//! Prelude for rxfe-atomic.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::counters::{CounterSnapshot, StreamCounters};
