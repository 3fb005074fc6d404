//! Capture engine trait definition.
//!
//! The capture engine is the parallel-port state machine that clocks ADC
//! samples into transfer buffers, together with the multi-producer DMA
//! transfer that drains those buffers into the USB data endpoint.

use crate::error::HalResult;

/// Raw state index of the capture state machine.
///
/// The state machine is loaded as an opaque program; the core only needs to
/// know where it starts and which states mean "downstream is not keeping up".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CaptureState(pub u8);

impl CaptureState {
    /// Reset state. The state machine is loaded and started from here.
    pub const RESET: Self = Self(0);
    /// Idle, waiting for the software trigger.
    pub const IDLE: Self = Self(1);
    /// Reading samples into a buffer on thread 0.
    pub const READ_THREAD0: Self = Self(2);
    /// Reading samples into a buffer on thread 1.
    pub const READ_THREAD1: Self = Self(3);
    /// Buffer on thread 0 is full, waiting for it to drain.
    pub const FULL_THREAD0: Self = Self(5);
    /// Buffer on thread 1 is full, waiting for it to drain.
    pub const FULL_THREAD1: Self = Self(6);
    /// Waiting for a free buffer on thread 0.
    pub const WAIT_THREAD0: Self = Self(7);
    /// Waiting for a free buffer on thread 1.
    pub const WAIT_THREAD1: Self = Self(8);

    /// States entered when the consumer side has fallen behind.
    pub const BACKPRESSURE: [Self; 4] = [
        Self::FULL_THREAD0,
        Self::FULL_THREAD1,
        Self::WAIT_THREAD0,
        Self::WAIT_THREAD1,
    ];

    /// Raw state index.
    #[must_use]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Whether this is one of the four backpressure states.
    #[must_use]
    pub fn is_backpressure(self) -> bool {
        Self::BACKPRESSURE.contains(&self)
    }
}

impl core::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::RESET => write!(f, "Reset"),
            Self::IDLE => write!(f, "Idle"),
            Self::READ_THREAD0 => write!(f, "ReadThread0"),
            Self::READ_THREAD1 => write!(f, "ReadThread1"),
            Self::FULL_THREAD0 => write!(f, "FullThread0"),
            Self::FULL_THREAD1 => write!(f, "FullThread1"),
            Self::WAIT_THREAD0 => write!(f, "WaitThread0"),
            Self::WAIT_THREAD1 => write!(f, "WaitThread1"),
            Self(other) => write!(f, "State{other}"),
        }
    }
}

/// Capture engine facade consumed by the streaming controller.
///
/// Every method is synchronous and bounded. Implementations use interior
/// synchronization, so a single instance can be shared between the command
/// dispatcher and the watchdog thread.
///
/// # Ordering Contract
///
/// Callers arm the DMA transfer before loading the state machine, and
/// de-assert the trigger before force-disabling it. The facade does not
/// enforce this ordering itself.
pub trait CaptureEngine: Send + Sync {
    /// Load the capture program and start it at `state_index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state machine cannot be loaded or started.
    fn load_and_start(&self, state_index: u8) -> HalResult<()>;

    /// Disable the state machine regardless of its current state.
    ///
    /// Must succeed even if the machine is parked in a backpressure state.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware refuses the disable request.
    fn force_disable(&self) -> HalResult<()>;

    /// Current state index of the state machine (live read).
    fn state(&self) -> CaptureState;

    /// Assert or de-assert the software capture trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if the control register cannot be written.
    fn set_software_trigger(&self, asserted: bool) -> HalResult<()>;

    /// Reset the DMA transfer, dropping any buffers owned by the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the DMA channel cannot be reset.
    fn reset_transfer(&self) -> HalResult<()>;

    /// Arm the multi-producer DMA transfer with `buffer_count` buffers of
    /// `buffer_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer cannot be armed.
    fn arm_transfer(&self, buffer_size: u32, buffer_count: u32) -> HalResult<()>;

    /// Flush the downstream USB data endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be stalled and flushed.
    fn flush_endpoint(&self) -> HalResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_bounds() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn CaptureEngine>();
    }

    #[test]
    fn test_backpressure_states() {
        for state in CaptureState::BACKPRESSURE {
            assert!(state.is_backpressure());
        }
        assert!(!CaptureState::RESET.is_backpressure());
        assert!(!CaptureState::READ_THREAD0.is_backpressure());
        assert!(!CaptureState::READ_THREAD1.is_backpressure());
        assert!(!CaptureState(200).is_backpressure());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CaptureState::WAIT_THREAD1.to_string(), "WaitThread1");
        assert_eq!(CaptureState(42).to_string(), "State42");
    }
}
