//! Command router and device handle.

use std::sync::Arc;

use rxfe_atomic::StreamCounters;
use rxfe_clock::{ClockSynth, SynthesisError};
use rxfe_hal::{CaptureEngine, RegisterBus};

use crate::command::{Command, RejectReason, Response};
use crate::config::FrontendConfig;
use crate::controller::StreamController;
use crate::diagnostics::{self, DiagnosticsSnapshot};
use crate::error::{FlushError, FrontendError, FrontendResult, StartError, StopError};
use crate::preflight;
use crate::state::PipelineState;
use crate::watchdog::{StallWatchdog, WatchdogRunner};

/// The assembled front-end: clock, controller, watchdog and counters
/// sharing one device.
///
/// `Frontend` is the entry point for host commands
/// ([`dispatch`](Self::dispatch)) and for hardware events
/// ([`on_buffer_complete`](Self::on_buffer_complete),
/// [`on_hardware_error`](Self::on_hardware_error)). All methods take `&self`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rxfe_hal::SimulatedFrontend;
/// use rxfe_stream::prelude::*;
///
/// let device = Arc::new(SimulatedFrontend::new());
/// let frontend = Frontend::new(device.clone(), device, FrontendConfig::default())?;
///
/// assert_eq!(
///     frontend.dispatch(Command::BeginStreaming),
///     Response::Rejected(RejectReason::ClockDisabled)
/// );
/// assert_eq!(frontend.dispatch(Command::SetClockFrequency(64_000_000)), Response::Ack);
/// assert_eq!(frontend.dispatch(Command::BeginStreaming), Response::Ack);
/// # Ok::<(), rxfe_stream::FrontendError>(())
/// ```
#[derive(Debug)]
pub struct Frontend {
    config: FrontendConfig,
    controller: Arc<StreamController>,
    watchdog: Arc<StallWatchdog>,
}

impl Frontend {
    /// Assemble a front-end over a capture engine and the clock generator
    /// bus. The clock starts disabled and the pipeline idle.
    ///
    /// # Errors
    ///
    /// Returns [`FrontendError::Config`] if `config` fails validation.
    pub fn new(
        capture: Arc<dyn CaptureEngine>,
        bus: Arc<dyn RegisterBus>,
        config: FrontendConfig,
    ) -> FrontendResult<Self> {
        config.validate()?;
        let counters = Arc::new(StreamCounters::new());
        let clock = ClockSynth::new(bus, config.clock, Arc::clone(&counters))?;
        let controller = Arc::new(StreamController::new(
            capture,
            Arc::new(clock),
            counters,
            config.transfer,
        ));
        let watchdog = Arc::new(StallWatchdog::from_config(
            Arc::clone(&controller),
            &config.watchdog,
        ));
        tracing::debug!(config = ?config, "Front-end assembled");
        Ok(Self {
            config,
            controller,
            watchdog,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Streaming controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<StreamController> {
        &self.controller
    }

    /// Stall watchdog, for driving ticks manually.
    #[must_use]
    pub fn watchdog(&self) -> &Arc<StallWatchdog> {
        &self.watchdog
    }

    /// Sample clock driver.
    #[must_use]
    pub fn clock(&self) -> &Arc<ClockSynth> {
        self.controller.clock()
    }

    /// Shared counter block.
    #[must_use]
    pub fn counters(&self) -> &Arc<StreamCounters> {
        self.controller.counters()
    }

    /// Current pipeline state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.controller.state()
    }

    /// Start the stall watchdog on its own thread at the configured period.
    ///
    /// # Errors
    ///
    /// Returns [`FrontendError::Spawn`] if the thread cannot be created.
    pub fn spawn_watchdog(&self) -> FrontendResult<WatchdogRunner> {
        WatchdogRunner::spawn(Arc::clone(&self.watchdog), self.config.watchdog.period())
            .map_err(FrontendError::Spawn)
    }

    /// Decode and dispatch a vendor request.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownOpcode`](crate::CommandError::UnknownOpcode)
    /// for an unrecognized request code.
    pub fn handle_request(&self, request: u8, value: u32) -> FrontendResult<Response> {
        let command = Command::from_request(request, value).inspect_err(|e| {
            tracing::warn!(request, error = %e, "Rejected vendor request");
        })?;
        Ok(self.dispatch(command))
    }

    /// Execute one host command.
    pub fn dispatch(&self, command: Command) -> Response {
        tracing::debug!(command = ?command, "Dispatching command");
        match command {
            Command::SetClockFrequency(hz) => match self.set_clock_frequency(hz) {
                Ok(()) => Response::Ack,
                Err(e) => Response::Failed(e.to_string()),
            },
            Command::BeginStreaming => match self.begin_streaming() {
                Ok(()) => Response::Ack,
                Err(FrontendError::Preflight(reason)) => Response::Rejected(reason.into()),
                Err(FrontendError::Start(StartError::AlreadyActive { .. })) => {
                    Response::Rejected(RejectReason::AlreadyStreaming)
                }
                Err(e) => Response::Failed(e.to_string()),
            },
            Command::EndStreaming => match self.end_streaming() {
                Ok(()) => Response::Ack,
                Err(StopError::NotActive) => Response::Rejected(RejectReason::NotStreaming),
                Err(e) => Response::Failed(e.to_string()),
            },
            Command::GetDiagnostics => Response::Diagnostics(self.diagnostics().record),
        }
    }

    /// Program the sample clock; 0 powers it down.
    ///
    /// # Errors
    ///
    /// Returns the synthesis error; the clock is left disabled.
    pub fn set_clock_frequency(&self, hz: u32) -> Result<(), SynthesisError> {
        self.clock().set_frequency(hz)
    }

    /// Run the preflight gate and start streaming.
    ///
    /// A pipeline that is already active is refused before the clock is
    /// queried.
    ///
    /// # Errors
    ///
    /// Returns [`FrontendError::Start`] with
    /// [`StartError::AlreadyActive`] when not idle,
    /// [`FrontendError::Preflight`] when the clock is not ready, or
    /// [`FrontendError::Start`] when bring-up fails.
    pub fn begin_streaming(&self) -> FrontendResult<()> {
        let state = self.controller.state();
        if state != PipelineState::Idle {
            return Err(StartError::AlreadyActive { state }.into());
        }
        preflight::check(self.clock())?;
        self.controller.start()?;
        Ok(())
    }

    /// Stop streaming.
    ///
    /// # Errors
    ///
    /// Returns [`StopError::NotActive`] when idle, or the first failed
    /// teardown step.
    pub fn end_streaming(&self) -> Result<(), StopError> {
        self.controller.stop()
    }

    /// Discard in-flight buffers. Only legal while idle.
    ///
    /// # Errors
    ///
    /// Returns [`FlushError::Active`] unless idle, or the failed step.
    pub fn flush(&self) -> Result<(), FlushError> {
        self.controller.flush()
    }

    /// Read every diagnostic.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        diagnostics::snapshot(&self.controller)
    }

    /// Buffer-complete event from the DMA fabric.
    #[inline]
    pub fn on_buffer_complete(&self) -> Option<u32> {
        self.controller.on_buffer_complete()
    }

    /// Error event from the capture interface.
    pub fn on_hardware_error(&self, code: u16) {
        self.controller.on_hardware_error(code);
    }
}
