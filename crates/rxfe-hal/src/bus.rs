//! Register bus trait definition.

use crate::error::BusError;

/// Simple register bus to an external peripheral (the clock generator).
///
/// Reads address a single register. Writes are bursts: the first byte is the
/// start register, the remaining bytes land in consecutive registers.
pub trait RegisterBus: Send + Sync {
    /// Read one register.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn read(&self, register: u8) -> Result<u8, BusError>;

    /// Write `bytes[1..]` starting at register `bytes[0]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails or `bytes` is empty.
    fn write_sequence(&self, bytes: &[u8]) -> Result<(), BusError>;

    /// Write a single register.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn write(&self, register: u8, value: u8) -> Result<(), BusError> {
        self.write_sequence(&[register, value])
    }
}
