//! Stall watchdog.
//!
//! A wedge is a pipeline that stopped producing buffers without reporting
//! an error. The watchdog tells a wedge apart from a slow consumer by
//! requiring two things on every poll: the completion counter has not moved,
//! and the capture state machine is parked in a backpressure state. Only
//! after `stall_threshold` such polls in a row does it tear the pipeline
//! down, restarting it if the sample clock still reports lock.
//!
//! A counter that has never advanced (still zero) is treated as startup
//! latency and never counts as a stall.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use portable_atomic::{AtomicU32, AtomicU64, Ordering};

use crate::config::WatchdogConfig;
use crate::controller::{RecoveryOutcome, StreamController};
use crate::state::PipelineState;

/// Result of one watchdog poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The pipeline was not streaming.
    Inactive,
    /// Buffers are flowing, or the stall evidence was not conclusive.
    Healthy,
    /// Stalled poll number `polls`, below the threshold.
    Stalled {
        /// Consecutive stalled polls so far.
        polls: u32,
    },
    /// The threshold was reached and the pipeline was torn down.
    Recovered(RecoveryOutcome),
}

/// Periodic stall detector for one [`StreamController`].
///
/// `tick` is meant to be driven from a single thread, normally a
/// [`WatchdogRunner`].
pub struct StallWatchdog {
    controller: Arc<StreamController>,
    stall_threshold: u32,
    previous_count: AtomicU32,
    ticks: AtomicU64,
}

impl core::fmt::Debug for StallWatchdog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StallWatchdog")
            .field("stall_threshold", &self.stall_threshold)
            .field("previous_count", &self.previous_count.load(Ordering::Relaxed))
            .field("ticks", &self.ticks.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl StallWatchdog {
    /// Create a watchdog. A zero threshold is treated as 1.
    #[must_use]
    pub fn new(controller: Arc<StreamController>, stall_threshold: u32) -> Self {
        Self {
            controller,
            stall_threshold: stall_threshold.max(1),
            previous_count: AtomicU32::new(0),
            ticks: AtomicU64::new(0),
        }
    }

    /// Create a watchdog from configuration.
    #[must_use]
    pub fn from_config(controller: Arc<StreamController>, config: &WatchdogConfig) -> Self {
        Self::new(controller, config.stall_threshold)
    }

    /// Stalled polls required before recovery.
    #[must_use]
    pub fn stall_threshold(&self) -> u32 {
        self.stall_threshold
    }

    /// Number of polls run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run one poll.
    pub fn tick(&self) -> TickOutcome {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        let counters = self.controller.counters();

        if self.controller.state() != PipelineState::Streaming {
            counters.clear_stall_polls();
            self.previous_count.store(0, Ordering::Relaxed);
            return TickOutcome::Inactive;
        }

        let current = counters.buffer_completions();
        let previous = self.previous_count.swap(current, Ordering::Relaxed);
        if current != previous {
            counters.clear_stall_polls();
            return TickOutcome::Healthy;
        }
        if previous == 0 {
            return TickOutcome::Healthy;
        }

        let capture_state = self.controller.capture_state();
        if !capture_state.is_backpressure() {
            counters.clear_stall_polls();
            return TickOutcome::Healthy;
        }

        let Some(polls) = self.controller.record_stall_poll() else {
            self.previous_count.store(0, Ordering::Relaxed);
            return TickOutcome::Inactive;
        };
        tracing::warn!(
            polls,
            threshold = self.stall_threshold,
            buffers = current,
            capture_state = %capture_state,
            "Capture pipeline stalled"
        );
        if polls < self.stall_threshold {
            return TickOutcome::Stalled { polls };
        }

        let attempt_restart = self.controller.clock().is_locked();
        let outcome = self.controller.internal_recover(attempt_restart);
        counters.clear_stall_polls();
        self.previous_count.store(0, Ordering::Relaxed);
        TickOutcome::Recovered(outcome)
    }
}

/// Background thread ticking a [`StallWatchdog`] at a fixed period.
///
/// Dropping the runner stops and joins the thread.
#[derive(Debug)]
pub struct WatchdogRunner {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WatchdogRunner {
    /// Thread name used for the runner.
    pub const THREAD_NAME: &'static str = "rxfe-watchdog";

    /// Start ticking `watchdog` every `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(watchdog: Arc<StallWatchdog>, period: Duration) -> std::io::Result<Self> {
        let (shutdown, requests) = channel::bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name(Self::THREAD_NAME.to_string())
            .spawn(move || {
                tracing::debug!(period_ms = period.as_millis(), "Watchdog thread started");
                loop {
                    match requests.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let TickOutcome::Recovered(outcome) = watchdog.tick() {
                                tracing::info!(outcome = %outcome, "Watchdog recovery complete");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("Watchdog thread stopped");
            })?;
        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Whether the thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // A full or disconnected channel already means "stop".
            if shutdown.try_send(()).is_err() {
                tracing::trace!("Watchdog shutdown signal already pending");
            }
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("Watchdog thread panicked");
        }
    }
}

impl Drop for WatchdogRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferConfig;
    use rxfe_atomic::StreamCounters;
    use rxfe_clock::{ClockSynth, SynthConfig};
    use rxfe_hal::{CaptureState, SimulatedFrontend};

    fn streaming() -> Result<(Arc<SimulatedFrontend>, Arc<StreamController>), Box<dyn std::error::Error>>
    {
        let sim = Arc::new(SimulatedFrontend::new());
        let counters = Arc::new(StreamCounters::new());
        let clock = Arc::new(ClockSynth::new(
            sim.clone(),
            SynthConfig::default(),
            counters.clone(),
        )?);
        clock.set_frequency(64_000_000)?;
        let controller = Arc::new(StreamController::new(
            sim.clone(),
            clock,
            counters,
            TransferConfig::default(),
        ));
        controller.start()?;
        Ok((sim, controller))
    }

    #[test]
    fn test_inactive_when_idle() -> Result<(), Box<dyn std::error::Error>> {
        let (_sim, controller) = streaming()?;
        controller.stop()?;
        let watchdog = StallWatchdog::new(controller, 3);
        assert_eq!(watchdog.tick(), TickOutcome::Inactive);
        Ok(())
    }

    #[test]
    fn test_stall_escalates_to_recovery() -> Result<(), Box<dyn std::error::Error>> {
        let (sim, controller) = streaming()?;
        let watchdog = StallWatchdog::new(controller.clone(), 3);
        controller.on_buffer_complete();
        assert_eq!(watchdog.tick(), TickOutcome::Healthy);

        sim.force_capture_state(Some(CaptureState::WAIT_THREAD0));
        assert_eq!(watchdog.tick(), TickOutcome::Stalled { polls: 1 });
        assert_eq!(watchdog.tick(), TickOutcome::Stalled { polls: 2 });
        assert_eq!(
            watchdog.tick(),
            TickOutcome::Recovered(RecoveryOutcome::Restarted)
        );
        assert_eq!(controller.counters().stall_polls(), 0);
        Ok(())
    }

    #[test]
    fn test_zero_threshold_clamped() -> Result<(), Box<dyn std::error::Error>> {
        let (_sim, controller) = streaming()?;
        assert_eq!(StallWatchdog::new(controller, 0).stall_threshold(), 1);
        Ok(())
    }

    #[test]
    fn test_runner_shutdown() -> Result<(), Box<dyn std::error::Error>> {
        let (_sim, controller) = streaming()?;
        let watchdog = Arc::new(StallWatchdog::new(controller, 3));
        let runner = WatchdogRunner::spawn(watchdog.clone(), Duration::from_millis(1))?;
        assert!(runner.is_running() || watchdog.ticks() > 0);
        runner.shutdown();

        let ticks = watchdog.ticks();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(watchdog.ticks(), ticks);
        Ok(())
    }
}
