//! Pipeline lifecycle state.
//!
//! The state is an atomic so callbacks and diagnostics can read it without
//! taking the controller's sequence lock. Transitions are only made by the
//! controller while it holds that lock.

use portable_atomic::{AtomicU32, Ordering};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the capture pipeline.
///
/// ```text
/// Idle ──start()──► Streaming ──stop()──► Idle
///                     │    ▲
///                 (stall)  (restart ok)
///                     ▼    │
///                   Recovering ──(clock unhealthy / rebuild failed / stop())──► Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PipelineState {
    /// Not streaming. The only state from which a start is legal.
    #[default]
    Idle = 0,
    /// Capture engine and DMA are running.
    Streaming = 1,
    /// The watchdog is tearing the pipeline down and possibly rebuilding it.
    Recovering = 2,
}

impl PipelineState {
    /// Convert from raw u32 value.
    #[must_use]
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Streaming),
            2 => Some(Self::Recovering),
            _ => None,
        }
    }

    /// Convert to raw u32 value.
    #[must_use]
    pub fn to_raw(self) -> u32 {
        self as u32
    }

    /// Whether the pipeline owns hardware (streaming or recovering).
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Streaming | Self::Recovering)
    }

    /// Get the state as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Streaming => "Streaming",
            Self::Recovering => "Recovering",
        }
    }
}

impl core::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Atomic cell holding a [`PipelineState`].
#[derive(Debug)]
pub struct PipelineStateCell {
    state: AtomicU32,
}

impl Default for PipelineStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStateCell {
    /// Create a cell in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU32::new(PipelineState::Idle.to_raw()),
        }
    }

    /// Current state.
    #[must_use]
    pub fn load(&self) -> PipelineState {
        PipelineState::from_raw(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Move from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns the actual current state if it is not `from`.
    pub fn transition(&self, from: PipelineState, to: PipelineState) -> Result<(), PipelineState> {
        self.state
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|current| PipelineState::from_raw(current).unwrap_or_default())
    }

    /// Unconditionally set the state, returning the previous one.
    pub fn set(&self, to: PipelineState) -> PipelineState {
        PipelineState::from_raw(self.state.swap(to.to_raw(), Ordering::AcqRel)).unwrap_or_default()
    }
}
