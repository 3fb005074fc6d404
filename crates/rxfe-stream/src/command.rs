//! Host command boundary.
//!
//! The host drives the front-end with vendor control requests. Each request
//! decodes to a [`Command`]; dispatching it yields a [`Response`] whose
//! [`status_byte`](Response::status_byte) goes back on the control endpoint.

use crate::diagnostics::{DiagnosticsRecord, RECORD_LEN};
use crate::error::{CommandError, PreflightError};

/// Vendor request codes.
pub mod opcode {
    /// Start streaming.
    pub const BEGIN_STREAMING: u8 = 0xAA;
    /// Stop streaming.
    pub const END_STREAMING: u8 = 0xAB;
    /// Program the sample clock; the request value is the frequency in Hz.
    pub const SET_CLOCK_FREQUENCY: u8 = 0xB2;
    /// Read the diagnostics record.
    pub const GET_DIAGNOSTICS: u8 = 0xB3;
}

/// A decoded host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Program the sample clock; 0 powers the output down.
    SetClockFrequency(u32),
    /// Run the preflight gate, then start streaming.
    BeginStreaming,
    /// Stop streaming.
    EndStreaming,
    /// Read diagnostics.
    GetDiagnostics,
}

impl Command {
    /// Decode a vendor request.
    ///
    /// `value` is only meaningful for [`opcode::SET_CLOCK_FREQUENCY`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownOpcode`] for any other request code.
    pub fn from_request(request: u8, value: u32) -> Result<Self, CommandError> {
        match request {
            opcode::BEGIN_STREAMING => Ok(Self::BeginStreaming),
            opcode::END_STREAMING => Ok(Self::EndStreaming),
            opcode::SET_CLOCK_FREQUENCY => Ok(Self::SetClockFrequency(value)),
            opcode::GET_DIAGNOSTICS => Ok(Self::GetDiagnostics),
            other => Err(CommandError::UnknownOpcode(other)),
        }
    }

    /// Vendor request code for this command.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::SetClockFrequency(_) => opcode::SET_CLOCK_FREQUENCY,
            Self::BeginStreaming => opcode::BEGIN_STREAMING,
            Self::EndStreaming => opcode::END_STREAMING,
            Self::GetDiagnostics => opcode::GET_DIAGNOSTICS,
        }
    }
}

/// Why a command was refused without touching hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The sample clock is not enabled.
    ClockDisabled,
    /// The sample clock PLL is not locked.
    ClockUnlocked,
    /// A stream is already running or recovering.
    AlreadyStreaming,
    /// No stream is running.
    NotStreaming,
}

impl RejectReason {
    /// Status byte for this reason.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::ClockDisabled => 0x01,
            Self::ClockUnlocked => 0x02,
            Self::AlreadyStreaming => 0x03,
            Self::NotStreaming => 0x04,
        }
    }
}

impl From<PreflightError> for RejectReason {
    fn from(err: PreflightError) -> Self {
        match err {
            PreflightError::ClockDisabled => Self::ClockDisabled,
            PreflightError::ClockUnlocked => Self::ClockUnlocked,
        }
    }
}

/// Result of dispatching a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The command completed.
    Ack,
    /// A precondition failed; nothing was changed.
    Rejected(RejectReason),
    /// The command was attempted and a hardware step failed.
    Failed(String),
    /// Diagnostics payload.
    Diagnostics(DiagnosticsRecord),
}

impl Response {
    /// Status byte returned on the control endpoint.
    ///
    /// `0x00` for success (including diagnostics), the reason code for a
    /// rejection, `0xFF` for a failure.
    #[must_use]
    pub fn status_byte(&self) -> u8 {
        match self {
            Self::Ack | Self::Diagnostics(_) => 0x00,
            Self::Rejected(reason) => reason.code(),
            Self::Failed(_) => 0xFF,
        }
    }

    /// Data stage payload, if the response carries one.
    #[must_use]
    pub fn payload(&self) -> Option<[u8; RECORD_LEN]> {
        match self {
            Self::Diagnostics(record) => Some(record.to_bytes()),
            _ => None,
        }
    }

    /// Whether the command completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_byte() == 0x00
    }
}
