//! Error types for the streaming control plane.

use rxfe_clock::SynthesisError;
use rxfe_hal::HalError;
use thiserror::Error;

use crate::state::PipelineState;

/// Reasons the preflight gate refuses a stream start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreflightError {
    /// The sample clock output has not been successfully programmed.
    #[error("Sample clock is disabled")]
    ClockDisabled,

    /// The sample clock PLL does not report lock.
    #[error("Sample clock PLL is not locked")]
    ClockUnlocked,
}

/// Errors from [`StreamController::start`](crate::StreamController::start).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    /// The pipeline is not idle. Start requests are not queued.
    #[error("Pipeline already active: {state}")]
    AlreadyActive {
        /// State observed when the request arrived.
        state: PipelineState,
    },

    /// A hardware step failed; the pipeline stays idle.
    #[error("Stream start failed at {step}: {source}")]
    Hardware {
        /// Bring-up step that failed.
        step: &'static str,
        /// Underlying facade error.
        #[source]
        source: HalError,
    },
}

/// Errors from [`StreamController::stop`](crate::StreamController::stop).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopError {
    /// The pipeline is idle.
    #[error("Pipeline is not streaming")]
    NotActive,

    /// A teardown step failed. The remaining steps still ran and the
    /// pipeline is idle.
    #[error("Stream stop step {step} failed: {source}")]
    Hardware {
        /// First teardown step that failed.
        step: &'static str,
        /// Underlying facade error.
        #[source]
        source: HalError,
    },
}

/// Errors from [`StreamController::flush`](crate::StreamController::flush).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlushError {
    /// Buffers can only be discarded while idle.
    #[error("Cannot flush while pipeline is {state}")]
    Active {
        /// Current pipeline state.
        state: PipelineState,
    },

    /// A flush step failed.
    #[error("Flush step {step} failed: {source}")]
    Hardware {
        /// Step that failed.
        step: &'static str,
        /// Underlying facade error.
        #[source]
        source: HalError,
    },
}

/// Errors decoding a control request or a diagnostics record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The vendor request code is not a known command.
    #[error("Unknown request opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// A diagnostics record had the wrong length.
    #[error("Diagnostics record must be {expected} bytes, got {actual}")]
    RecordLength {
        /// Required length.
        expected: usize,
        /// Received length.
        actual: usize,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Top-level error for [`Frontend`](crate::Frontend) operations.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Clock programming failed.
    #[error(transparent)]
    Clock(#[from] SynthesisError),

    /// Preflight gate refused the start.
    #[error("Stream start rejected: {0}")]
    Preflight(#[from] PreflightError),

    /// Stream start failed.
    #[error(transparent)]
    Start(#[from] StartError),

    /// Stream stop failed.
    #[error(transparent)]
    Stop(#[from] StopError),

    /// Flush failed.
    #[error(transparent)]
    Flush(#[from] FlushError),

    /// Request decoding failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The watchdog thread could not be started.
    #[error("Failed to spawn watchdog thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A specialized `Result` type for frontend operations.
pub type FrontendResult<T> = core::result::Result<T, FrontendError>;
