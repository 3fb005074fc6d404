//! Prelude for rxfe-stream.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::command::{Command, RejectReason, Response};
pub use crate::config::{FrontendConfig, FrontendConfigBuilder};
pub use crate::controller::{RecoveryOutcome, StreamController};
pub use crate::diagnostics::{DiagnosticsRecord, DiagnosticsSnapshot};
pub use crate::error::{
    CommandError, ConfigError, FlushError, FrontendError, FrontendResult, PreflightError,
    StartError, StopError,
};
pub use crate::frontend::Frontend;
pub use crate::state::PipelineState;
pub use crate::watchdog::{StallWatchdog, TickOutcome, WatchdogRunner};
