//! Error types for hardware facade operations.

use thiserror::Error;

/// Errors reported by the register bus (I2C to the clock generator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// The addressed device did not acknowledge the transfer.
    #[error("No acknowledge at register {register:#04x}")]
    Nack {
        /// First register of the failed transfer.
        register: u8,
    },
    /// The bus transfer did not complete in time.
    #[error("Bus transfer timed out")]
    Timeout,
    /// Another master won arbitration during the transfer.
    #[error("Bus arbitration lost")]
    ArbitrationLost,
    /// A write sequence carried no register address.
    #[error("Empty write sequence")]
    EmptySequence,
}

/// Errors that can occur while driving the capture engine, DMA or endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Register bus failure.
    #[error("Register bus error: {0}")]
    Bus(#[from] BusError),

    /// The capture state machine rejected an operation.
    #[error("Capture engine rejected {op}: status {code:#x}")]
    Capture {
        /// Operation name.
        op: &'static str,
        /// Vendor status code.
        code: u32,
    },

    /// A DMA channel operation failed.
    #[error("DMA {op} failed: status {code:#x}")]
    Dma {
        /// Operation name.
        op: &'static str,
        /// Vendor status code.
        code: u32,
    },

    /// The data endpoint could not be flushed.
    #[error("Endpoint flush failed: status {code:#x}")]
    Endpoint {
        /// Vendor status code.
        code: u32,
    },
}

impl HalError {
    /// Create a capture engine error.
    #[must_use]
    pub fn capture(op: &'static str, code: u32) -> Self {
        Self::Capture { op, code }
    }

    /// Create a DMA error.
    #[must_use]
    pub fn dma(op: &'static str, code: u32) -> Self {
        Self::Dma { op, code }
    }

    /// Create an endpoint error.
    #[must_use]
    pub fn endpoint(code: u32) -> Self {
        Self::Endpoint { code }
    }
}

/// A specialized `Result` type for hardware facade operations.
pub type HalResult<T> = core::result::Result<T, HalError>;
