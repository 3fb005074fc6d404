//! Diagnostics snapshot and its wire layout.
//!
//! # Wire Format
//!
//! 20 bytes, little-endian:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | buffer completions |
//! | 4 | 1 | capture state machine state |
//! | 5 | 4 | hardware (capture interface) errors |
//! | 9 | 2 | last hardware error argument |
//! | 11 | 4 | register bus failures |
//! | 15 | 4 | streaming faults (watchdog recoveries) |
//! | 19 | 1 | clock generator status byte |

use crate::controller::StreamController;
use crate::error::CommandError;
use crate::state::PipelineState;

/// Length of the encoded record.
pub const RECORD_LEN: usize = 20;

/// Clock status reported when the status register cannot be read: every
/// loss-of-lock and fault bit set.
pub const CLOCK_STATUS_UNREADABLE: u8 = 0xFF;

/// Diagnostics fields carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticsRecord {
    /// Buffers completed since the last start or restart.
    pub buffer_completions: u32,
    /// Live capture state machine state index.
    pub capture_state: u8,
    /// Capture interface error events.
    pub hardware_errors: u32,
    /// Argument of the most recent capture interface error.
    pub last_hardware_error: u16,
    /// Register bus failures.
    pub bus_failures: u32,
    /// Watchdog recoveries.
    pub streaming_faults: u32,
    /// Raw clock generator status byte.
    pub clock_status: u8,
}

impl DiagnosticsRecord {
    /// Encode to the 20-byte wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let count = self.buffer_completions.to_le_bytes();
        let errors = self.hardware_errors.to_le_bytes();
        let last = self.last_hardware_error.to_le_bytes();
        let bus = self.bus_failures.to_le_bytes();
        let faults = self.streaming_faults.to_le_bytes();
        let fields: [&[u8]; 7] = [
            &count,
            core::slice::from_ref(&self.capture_state),
            &errors,
            &last,
            &bus,
            &faults,
            core::slice::from_ref(&self.clock_status),
        ];

        let mut out = [0u8; RECORD_LEN];
        for (slot, byte) in out.iter_mut().zip(fields.into_iter().flatten()) {
            *slot = *byte;
        }
        out
    }

    /// Decode the 20-byte wire layout.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::RecordLength`] if `bytes` is not exactly
    /// [`RECORD_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CommandError> {
        let raw = <&[u8; RECORD_LEN]>::try_from(bytes)
            .ok()
            .ok_or(CommandError::RecordLength {
                expected: RECORD_LEN,
                actual: bytes.len(),
            })?;
        let [
            c0, c1, c2, c3, sm, e0, e1, e2, e3, l0, l1, b0, b1, b2, b3, f0, f1, f2, f3, clock,
        ] = *raw;
        Ok(Self {
            buffer_completions: u32::from_le_bytes([c0, c1, c2, c3]),
            capture_state: sm,
            hardware_errors: u32::from_le_bytes([e0, e1, e2, e3]),
            last_hardware_error: u16::from_le_bytes([l0, l1]),
            bus_failures: u32::from_le_bytes([b0, b1, b2, b3]),
            streaming_faults: u32::from_le_bytes([f0, f1, f2, f3]),
            clock_status: clock,
        })
    }

    /// Whether the clock status byte reports PLL A loss-of-lock.
    #[must_use]
    pub fn clock_unlocked(&self) -> bool {
        self.clock_status & rxfe_clock::registers::STATUS_LOL_A != 0
    }
}

/// Full diagnostics view, including fields not carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticsSnapshot {
    /// Wire-format fields.
    pub record: DiagnosticsRecord,
    /// Current run of stalled watchdog polls.
    pub stall_polls: u32,
    /// Pipeline state at the time of the snapshot.
    pub pipeline_state: PipelineState,
}

/// Read every diagnostic without side effects.
///
/// Fields are read independently and may be mutually inconsistent while the
/// pipeline is running. A failed clock status read is reported as
/// [`CLOCK_STATUS_UNREADABLE`] and is not counted as a bus failure.
#[must_use]
pub fn snapshot(controller: &StreamController) -> DiagnosticsSnapshot {
    let counters = controller.counters().snapshot();
    let clock_status = controller
        .clock()
        .read_status()
        .unwrap_or(CLOCK_STATUS_UNREADABLE);
    DiagnosticsSnapshot {
        record: DiagnosticsRecord {
            buffer_completions: counters.buffer_completions,
            capture_state: controller.capture_state().index(),
            hardware_errors: counters.pib_errors,
            last_hardware_error: counters.last_pib_error,
            bus_failures: counters.i2c_failures,
            streaming_faults: counters.streaming_faults,
            clock_status,
        },
        stall_polls: counters.stall_polls,
        pipeline_state: controller.state(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets() {
        let record = DiagnosticsRecord {
            buffer_completions: 0x0403_0201,
            capture_state: 0x05,
            hardware_errors: 0x0908_0706,
            last_hardware_error: 0x0B0A,
            bus_failures: 0x0F0E_0D0C,
            streaming_faults: 0x1312_1110,
            clock_status: 0x14,
        };
        let expected: Vec<u8> = (1..=20).collect();
        assert_eq!(record.to_bytes().to_vec(), expected);
        assert_eq!(DiagnosticsRecord::from_bytes(&expected), Ok(record));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            DiagnosticsRecord::from_bytes(&[0u8; 19]),
            Err(CommandError::RecordLength {
                expected: 20,
                actual: 19
            })
        );
    }

    #[test]
    fn test_unreadable_status_reads_unlocked() {
        let record = DiagnosticsRecord {
            clock_status: CLOCK_STATUS_UNREADABLE,
            ..DiagnosticsRecord::default()
        };
        assert!(record.clock_unlocked());
    }
}
