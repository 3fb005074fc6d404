//! Error types for clock synthesis.

use rxfe_hal::BusError;
use thiserror::Error;

/// Errors that can occur while planning or programming the sample clock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// The target cannot be produced with a valid divider chain.
    ///
    /// Raised before any register is written.
    #[error("Target frequency {target_hz} Hz out of range: {reason}")]
    OutOfRange {
        /// Requested output frequency.
        target_hz: u32,
        /// Which constraint was violated.
        reason: &'static str,
    },

    /// A register write or read failed part-way through programming.
    #[error("Clock generator bus error: {0}")]
    Bus(#[from] BusError),

    /// The synthesizer configuration is invalid.
    #[error("Invalid synthesizer configuration: {0}")]
    InvalidConfiguration(String),
}

impl SynthesisError {
    /// Create an out-of-range error.
    #[must_use]
    pub fn out_of_range(target_hz: u32, reason: &'static str) -> Self {
        Self::OutOfRange { target_hz, reason }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Whether the hardware may have been left partially programmed.
    #[must_use]
    pub fn touched_hardware(&self) -> bool {
        matches!(self, Self::Bus(_))
    }
}

/// A specialized `Result` type for clock synthesis.
pub type SynthesisResult<T> = core::result::Result<T, SynthesisError>;
