//! Simulated front-end implementation.
//!
//! This module provides `SimulatedFrontend`, a software implementation of
//! both facade traits for tests and hardware-free environments. It records
//! every mutating call, emulates the clock generator's register file and
//! lock bit, and supports per-operation fault injection.

use crate::bus::RegisterBus;
use crate::capture::{CaptureEngine, CaptureState};
use crate::error::{BusError, HalError, HalResult};
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// Status register of the emulated clock generator.
const STATUS_REGISTER: u8 = 0;
/// Loss-of-lock bit for PLL A in the status register.
const STATUS_LOL_A: u8 = 0x20;
/// PLL soft-reset register.
const PLL_RESET_REGISTER: u8 = 177;
/// Status code returned by injected faults.
const INJECTED_FAULT_CODE: u32 = 0x46;

/// One recorded facade call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalCall {
    /// `load_and_start(state_index)`.
    LoadAndStart(u8),
    /// `force_disable()`.
    ForceDisable,
    /// `set_software_trigger(asserted)`.
    SetSoftwareTrigger(bool),
    /// `reset_transfer()`.
    ResetTransfer,
    /// `arm_transfer(buffer_size, buffer_count)`.
    ArmTransfer {
        /// Buffer size in bytes.
        buffer_size: u32,
        /// Number of buffers.
        buffer_count: u32,
    },
    /// `flush_endpoint()`.
    FlushEndpoint,
    /// `read(register)`.
    BusRead(u8),
    /// `write_sequence(bytes)`.
    BusWrite(Vec<u8>),
}

impl HalCall {
    /// Whether the call changes hardware state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::BusRead(_))
    }

    /// The operation kind of this call.
    #[must_use]
    pub fn op(&self) -> HalOp {
        match self {
            Self::LoadAndStart(_) => HalOp::LoadAndStart,
            Self::ForceDisable => HalOp::ForceDisable,
            Self::SetSoftwareTrigger(_) => HalOp::SetSoftwareTrigger,
            Self::ResetTransfer => HalOp::ResetTransfer,
            Self::ArmTransfer { .. } => HalOp::ArmTransfer,
            Self::FlushEndpoint => HalOp::FlushEndpoint,
            Self::BusRead(_) => HalOp::BusRead,
            Self::BusWrite(_) => HalOp::BusWrite,
        }
    }
}

/// Facade operation kinds, used to inject faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum HalOp {
    /// `load_and_start`.
    LoadAndStart = 0,
    /// `force_disable`.
    ForceDisable = 1,
    /// `set_software_trigger`.
    SetSoftwareTrigger = 2,
    /// `reset_transfer`.
    ResetTransfer = 3,
    /// `arm_transfer`.
    ArmTransfer = 4,
    /// `flush_endpoint`.
    FlushEndpoint = 5,
    /// Register bus read.
    BusRead = 6,
    /// Register bus write.
    BusWrite = 7,
}

impl HalOp {
    fn mask(self) -> u32 {
        1u32 << (self as u32)
    }
}

/// Software implementation of [`CaptureEngine`] and [`RegisterBus`].
///
/// # Behaviour
///
/// - `load_and_start(0)` parks the state machine in `Idle` until the
///   software trigger is asserted, which moves it to `ReadThread0`.
/// - `arm_transfer` fails if the transfer is already armed, so callers must
///   reset before re-arming, as on the real DMA fabric.
/// - Writing the PLL reset register locks the emulated PLL; the lock bit can
///   be overridden with [`SimulatedFrontend::set_pll_locked`].
///
/// # Example
///
/// ```rust
/// use rxfe_hal::prelude::*;
///
/// let sim = SimulatedFrontend::new();
/// sim.arm_transfer(16384, 4).expect("arm");
/// sim.load_and_start(0).expect("load");
/// sim.set_software_trigger(true).expect("trigger");
/// assert_eq!(sim.state(), CaptureState::READ_THREAD0);
/// ```
#[derive(Debug)]
pub struct SimulatedFrontend {
    calls: Mutex<Vec<HalCall>>,
    registers: Mutex<[u8; 256]>,
    faults: AtomicU32,
    pll_locked: AtomicBool,
    state: AtomicU8,
    forced_state: Mutex<Option<CaptureState>>,
    running: AtomicBool,
    trigger: AtomicBool,
    transfer_armed: AtomicBool,
}

impl SimulatedFrontend {
    /// Create a simulated front-end with an unlocked, unprogrammed clock and
    /// a disabled capture engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            registers: Mutex::new([0u8; 256]),
            faults: AtomicU32::new(0),
            pll_locked: AtomicBool::new(false),
            state: AtomicU8::new(CaptureState::RESET.index()),
            forced_state: Mutex::new(None),
            running: AtomicBool::new(false),
            trigger: AtomicBool::new(false),
            transfer_armed: AtomicBool::new(false),
        }
    }

    /// All calls recorded so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<HalCall> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls that change hardware state.
    #[must_use]
    pub fn mutating_call_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_mutating()).count()
    }

    /// Number of recorded bus writes.
    #[must_use]
    pub fn bus_write_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op() == HalOp::BusWrite)
            .count()
    }

    /// Forget all recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make every subsequent `op` fail until cleared.
    pub fn inject_fault(&self, op: HalOp) {
        self.faults.fetch_or(op.mask(), Ordering::AcqRel);
    }

    /// Stop failing `op`.
    pub fn clear_fault(&self, op: HalOp) {
        self.faults.fetch_and(!op.mask(), Ordering::AcqRel);
    }

    /// Stop failing every operation.
    pub fn clear_faults(&self) {
        self.faults.store(0, Ordering::Release);
    }

    /// Pin the reported state machine state, or release the pin with `None`.
    pub fn force_capture_state(&self, state: Option<CaptureState>) {
        *self.forced_state.lock() = state;
    }

    /// Override the emulated PLL lock bit.
    pub fn set_pll_locked(&self, locked: bool) {
        self.pll_locked.store(locked, Ordering::Release);
    }

    /// Raw register value (no lock emulation, no call recorded).
    #[must_use]
    pub fn register(&self, address: u8) -> u8 {
        self.registers
            .lock()
            .get(usize::from(address))
            .copied()
            .unwrap_or(0)
    }

    /// `len` consecutive raw register values starting at `start`.
    #[must_use]
    pub fn registers(&self, start: u8, len: usize) -> Vec<u8> {
        let registers = self.registers.lock();
        registers
            .iter()
            .skip(usize::from(start))
            .take(len)
            .copied()
            .collect()
    }

    /// Whether the software trigger is asserted.
    #[must_use]
    pub fn is_trigger_asserted(&self) -> bool {
        self.trigger.load(Ordering::Acquire)
    }

    /// Whether the DMA transfer is armed.
    #[must_use]
    pub fn is_transfer_armed(&self) -> bool {
        self.transfer_armed.load(Ordering::Acquire)
    }

    /// Whether the capture state machine is enabled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn record(&self, call: HalCall) {
        tracing::trace!(call = ?call, "simulated facade call");
        self.calls.lock().push(call);
    }

    fn faulted(&self, op: HalOp) -> bool {
        self.faults.load(Ordering::Acquire) & op.mask() != 0
    }
}

impl Default for SimulatedFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureEngine for SimulatedFrontend {
    fn load_and_start(&self, state_index: u8) -> HalResult<()> {
        self.record(HalCall::LoadAndStart(state_index));
        if self.faulted(HalOp::LoadAndStart) {
            return Err(HalError::capture("load", INJECTED_FAULT_CODE));
        }
        let entry = if state_index == CaptureState::RESET.index() {
            CaptureState::IDLE
        } else {
            CaptureState(state_index)
        };
        self.state.store(entry.index(), Ordering::Release);
        self.running.store(true, Ordering::Release);
        if self.trigger.load(Ordering::Acquire) {
            self.state
                .store(CaptureState::READ_THREAD0.index(), Ordering::Release);
        }
        Ok(())
    }

    fn force_disable(&self) -> HalResult<()> {
        self.record(HalCall::ForceDisable);
        if self.faulted(HalOp::ForceDisable) {
            return Err(HalError::capture("disable", INJECTED_FAULT_CODE));
        }
        self.running.store(false, Ordering::Release);
        self.state
            .store(CaptureState::RESET.index(), Ordering::Release);
        Ok(())
    }

    fn state(&self) -> CaptureState {
        if let Some(forced) = *self.forced_state.lock() {
            return forced;
        }
        CaptureState(self.state.load(Ordering::Acquire))
    }

    fn set_software_trigger(&self, asserted: bool) -> HalResult<()> {
        self.record(HalCall::SetSoftwareTrigger(asserted));
        if self.faulted(HalOp::SetSoftwareTrigger) {
            return Err(HalError::capture("trigger", INJECTED_FAULT_CODE));
        }
        self.trigger.store(asserted, Ordering::Release);
        if self.running.load(Ordering::Acquire) {
            let next = if asserted {
                CaptureState::READ_THREAD0
            } else {
                CaptureState::IDLE
            };
            self.state.store(next.index(), Ordering::Release);
        }
        Ok(())
    }

    fn reset_transfer(&self) -> HalResult<()> {
        self.record(HalCall::ResetTransfer);
        if self.faulted(HalOp::ResetTransfer) {
            return Err(HalError::dma("reset", INJECTED_FAULT_CODE));
        }
        self.transfer_armed.store(false, Ordering::Release);
        Ok(())
    }

    fn arm_transfer(&self, buffer_size: u32, buffer_count: u32) -> HalResult<()> {
        self.record(HalCall::ArmTransfer {
            buffer_size,
            buffer_count,
        });
        if self.faulted(HalOp::ArmTransfer) {
            return Err(HalError::dma("arm", INJECTED_FAULT_CODE));
        }
        if self.transfer_armed.swap(true, Ordering::AcqRel) {
            return Err(HalError::dma("arm", 0x41));
        }
        Ok(())
    }

    fn flush_endpoint(&self) -> HalResult<()> {
        self.record(HalCall::FlushEndpoint);
        if self.faulted(HalOp::FlushEndpoint) {
            return Err(HalError::endpoint(INJECTED_FAULT_CODE));
        }
        Ok(())
    }
}

impl RegisterBus for SimulatedFrontend {
    fn read(&self, register: u8) -> Result<u8, BusError> {
        self.record(HalCall::BusRead(register));
        if self.faulted(HalOp::BusRead) {
            return Err(BusError::Nack { register });
        }
        let raw = self.register(register);
        if register == STATUS_REGISTER {
            if self.pll_locked.load(Ordering::Acquire) {
                return Ok(raw & !STATUS_LOL_A);
            }
            return Ok(raw | STATUS_LOL_A);
        }
        Ok(raw)
    }

    fn write_sequence(&self, bytes: &[u8]) -> Result<(), BusError> {
        self.record(HalCall::BusWrite(bytes.to_vec()));
        let Some((&start, data)) = bytes.split_first() else {
            return Err(BusError::EmptySequence);
        };
        if self.faulted(HalOp::BusWrite) {
            return Err(BusError::Nack { register: start });
        }

        let mut registers = self.registers.lock();
        for (offset, value) in data.iter().enumerate() {
            if let Some(slot) = registers.get_mut(usize::from(start) + offset) {
                *slot = *value;
            }
        }
        drop(registers);

        if start == PLL_RESET_REGISTER && data.first().is_some_and(|v| v & 0x20 != 0) {
            self.pll_locked.store(true, Ordering::Release);
        }
        Ok(())
    }
}
