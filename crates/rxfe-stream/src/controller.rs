//! Streaming pipeline lifecycle.
//!
//! [`StreamController`] sequences the capture engine and the DMA transfer
//! through start, stop and watchdog-driven recovery. Every sequence runs
//! under one mutex so the command path and the watchdog thread never
//! interleave hardware calls; the state itself stays readable lock-free.
//!
//! # Bring-up Order
//!
//! The DMA transfer is always armed before the capture state machine is
//! loaded, and the software trigger is asserted last:
//!
//! ```text
//! reset_transfer -> arm_transfer -> load_and_start(0) -> trigger on
//! ```
//!
//! Teardown reverses it: trigger off, then force-disable.

use std::sync::Arc;

use parking_lot::Mutex;
use rxfe_atomic::StreamCounters;
use rxfe_clock::ClockSynth;
use rxfe_hal::{CaptureEngine, CaptureState, HalError, HalResult};

use crate::config::TransferConfig;
use crate::error::{FlushError, StartError, StopError};
use crate::state::{PipelineState, PipelineStateCell};

/// State index the capture program starts from.
pub const CAPTURE_ENTRY_STATE: u8 = 0;

/// Result of a watchdog-driven teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The pipeline was not streaming; nothing was done.
    Skipped,
    /// The pipeline was torn down and brought back up.
    Restarted,
    /// The pipeline was torn down and left idle.
    Stopped,
}

impl RecoveryOutcome {
    /// Get the outcome as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "Skipped",
            Self::Restarted => "Restarted",
            Self::Stopped => "Stopped",
        }
    }
}

impl core::fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owner of the pipeline state and the hardware sequencing.
pub struct StreamController {
    capture: Arc<dyn CaptureEngine>,
    clock: Arc<ClockSynth>,
    counters: Arc<StreamCounters>,
    transfer: TransferConfig,
    state: PipelineStateCell,
    sequence: Mutex<()>,
}

impl core::fmt::Debug for StreamController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamController")
            .field("state", &self.state.load())
            .field("transfer", &self.transfer)
            .field("counters", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl StreamController {
    /// Create an idle controller.
    ///
    /// `counters` must be the same block the clock driver reports bus
    /// failures into.
    #[must_use]
    pub fn new(
        capture: Arc<dyn CaptureEngine>,
        clock: Arc<ClockSynth>,
        counters: Arc<StreamCounters>,
        transfer: TransferConfig,
    ) -> Self {
        Self {
            capture,
            clock,
            counters,
            transfer,
            state: PipelineStateCell::new(),
            sequence: Mutex::new(()),
        }
    }

    /// Current pipeline state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state.load()
    }

    /// Live capture state machine state.
    #[must_use]
    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Shared counter block.
    #[must_use]
    pub fn counters(&self) -> &Arc<StreamCounters> {
        &self.counters
    }

    /// Sample clock driver.
    #[must_use]
    pub fn clock(&self) -> &Arc<ClockSynth> {
        &self.clock
    }

    /// DMA transfer sizing.
    #[must_use]
    pub fn transfer_config(&self) -> TransferConfig {
        self.transfer
    }

    /// Bring the pipeline up from `Idle`.
    ///
    /// Does not run the preflight gate; callers handling external commands
    /// run [`preflight::check`](crate::preflight::check) first. On success all
    /// counters are zeroed and the state is `Streaming`.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::AlreadyActive`] if not idle, or
    /// [`StartError::Hardware`] if a bring-up step fails. In the latter case
    /// whatever was brought up is torn down again and the state stays `Idle`.
    pub fn start(&self) -> Result<(), StartError> {
        let _sequence = self.sequence.lock();
        let state = self.state.load();
        if state != PipelineState::Idle {
            tracing::debug!(state = %state, "Start ignored, pipeline active");
            return Err(StartError::AlreadyActive { state });
        }

        self.bring_up(true).inspect_err(|e| {
            tracing::error!(error = %e, "Stream start failed");
        })?;

        self.state.set(PipelineState::Streaming);
        self.counters.reset_session();
        tracing::info!(
            buffer_size = self.transfer.buffer_size,
            buffer_count = self.transfer.buffer_count,
            "Streaming started"
        );
        Ok(())
    }

    /// Take the pipeline down to `Idle`.
    ///
    /// DMA and endpoint state are left alone; use [`flush`](Self::flush) to
    /// discard in-flight buffers.
    ///
    /// # Errors
    ///
    /// Returns [`StopError::NotActive`] if already idle, or the first failed
    /// step as [`StopError::Hardware`]. The pipeline is idle either way.
    pub fn stop(&self) -> Result<(), StopError> {
        let _sequence = self.sequence.lock();
        let state = self.state.load();
        if state == PipelineState::Idle {
            tracing::debug!("Stop ignored, pipeline idle");
            return Err(StopError::NotActive);
        }

        self.counters.end_buffer_session();
        let failure = self.tear_down_capture();
        self.enter_idle();

        match failure {
            Some((step, source)) => {
                tracing::error!(step, error = %source, "Stream stopped with teardown failure");
                Err(StopError::Hardware { step, source })
            }
            None => {
                tracing::info!(
                    buffers = self.counters.buffer_completions(),
                    "Streaming stopped"
                );
                Ok(())
            }
        }
    }

    /// Reset the DMA transfer and flush the data endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FlushError::Active`] unless idle, or the failed step.
    pub fn flush(&self) -> Result<(), FlushError> {
        let _sequence = self.sequence.lock();
        let state = self.state.load();
        if state != PipelineState::Idle {
            return Err(FlushError::Active { state });
        }

        step("reset_transfer", self.capture.reset_transfer())
            .and_then(|()| step("flush_endpoint", self.capture.flush_endpoint()))
            .map_err(|(step, source)| FlushError::Hardware { step, source })?;
        tracing::debug!("Transfer reset and endpoint flushed");
        Ok(())
    }

    /// Tear the pipeline down after a stall and optionally rebuild it.
    ///
    /// Only acts from `Streaming`; any other state returns
    /// [`RecoveryOutcome::Skipped`]. A rebuild is attempted only when
    /// `attempt_restart` is set, the teardown succeeded and the clock still
    /// reports lock. The streaming fault counter is bumped exactly once per
    /// non-skipped call.
    pub fn internal_recover(&self, attempt_restart: bool) -> RecoveryOutcome {
        let _sequence = self.sequence.lock();
        let state = self.state.load();
        if state != PipelineState::Streaming {
            tracing::debug!(state = %state, "Recovery skipped, pipeline not streaming");
            return RecoveryOutcome::Skipped;
        }
        self.counters.end_buffer_session();
        self.state.set(PipelineState::Recovering);
        self.counters.inc_streaming_fault();

        let mut clean = self.tear_down_capture().is_none();
        for (name, result) in [
            ("reset_transfer", self.capture.reset_transfer()),
            ("flush_endpoint", self.capture.flush_endpoint()),
        ] {
            if let Err((name, error)) = step(name, result) {
                tracing::warn!(step = name, error = %error, "Recovery teardown step failed");
                clean = false;
            }
        }

        let outcome = if !attempt_restart {
            RecoveryOutcome::Stopped
        } else if !clean {
            tracing::warn!("Recovery restart abandoned after teardown failure");
            RecoveryOutcome::Stopped
        } else if !self.clock.is_locked() {
            tracing::warn!("Recovery restart abandoned, sample clock unlocked");
            RecoveryOutcome::Stopped
        } else {
            match self.bring_up(false) {
                Ok(()) => RecoveryOutcome::Restarted,
                Err(e) => {
                    tracing::error!(error = %e, "Recovery rebuild failed");
                    RecoveryOutcome::Stopped
                }
            }
        };

        if outcome == RecoveryOutcome::Restarted
            && self
                .state
                .transition(PipelineState::Recovering, PipelineState::Streaming)
                .is_ok()
        {
            self.counters.clear_stall_polls();
            self.counters.begin_buffer_session();
        } else {
            self.enter_idle();
        }
        tracing::warn!(
            outcome = %outcome,
            faults = self.counters.streaming_faults(),
            "Pipeline recovered from stall"
        );
        outcome
    }

    /// Count one stalled watchdog poll, but only while streaming.
    ///
    /// Runs under the sequence lock so a concurrent stop cannot leave a
    /// nonzero stall count behind an idle pipeline. Returns the new run
    /// length, or `None` (with the run cleared) if not streaming.
    pub fn record_stall_poll(&self) -> Option<u32> {
        let _sequence = self.sequence.lock();
        if self.state.load() == PipelineState::Streaming {
            Some(self.counters.inc_stall_poll())
        } else {
            self.counters.clear_stall_polls();
            None
        }
    }

    /// Buffer-complete event from the DMA fabric.
    ///
    /// Counts only into the buffer session opened by the current start or
    /// restart, and returns the new total if counted. An event that observed
    /// a session which has since been closed is dropped. Never blocks.
    #[inline]
    pub fn on_buffer_complete(&self) -> Option<u32> {
        self.counters.inc_buffer_complete()
    }

    /// Error event from the capture interface.
    ///
    /// Recorded for diagnostics only; recovery is left to the watchdog.
    pub fn on_hardware_error(&self, code: u16) {
        self.counters.record_pib_error(code);
        tracing::warn!(code, state = %self.state.load(), "Capture interface error");
    }

    /// Arm DMA, load the state machine and assert the trigger. On failure the
    /// steps already taken are undone.
    fn bring_up(&self, reset_first: bool) -> Result<(), StartError> {
        if reset_first {
            step("reset_transfer", self.capture.reset_transfer()).map_err(hardware)?;
        }
        step(
            "arm_transfer",
            self.capture
                .arm_transfer(self.transfer.buffer_size, self.transfer.buffer_count),
        )
        .map_err(hardware)?;

        let loaded = step(
            "load_and_start",
            self.capture.load_and_start(CAPTURE_ENTRY_STATE),
        )
        .and_then(|()| step("set_software_trigger", self.capture.set_software_trigger(true)));
        if let Err(failure) = loaded {
            self.unwind_bring_up();
            return Err(hardware(failure));
        }
        Ok(())
    }

    fn unwind_bring_up(&self) {
        if let Some((step, error)) = self.tear_down_capture() {
            tracing::warn!(step, error = %error, "Unwind step failed");
        }
        if let Err(error) = self.capture.reset_transfer() {
            tracing::warn!(error = %error, "Unwind transfer reset failed");
        }
    }

    /// De-assert the trigger then force-disable, running both regardless.
    /// Returns the first failure.
    fn tear_down_capture(&self) -> Option<(&'static str, HalError)> {
        let trigger = step(
            "set_software_trigger",
            self.capture.set_software_trigger(false),
        );
        let disable = step("force_disable", self.capture.force_disable());
        trigger.and(disable).err()
    }

    fn enter_idle(&self) {
        self.counters.clear_stall_polls();
        self.state.set(PipelineState::Idle);
    }
}

fn step(name: &'static str, result: HalResult<()>) -> Result<(), (&'static str, HalError)> {
    result.map_err(|error| (name, error))
}

fn hardware((step, source): (&'static str, HalError)) -> StartError {
    StartError::Hardware { step, source }
}
