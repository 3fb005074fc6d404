//! Stream and wedge counters.
//!
//! This module provides [`StreamCounters`], the single counter block shared
//! by the streaming controller, the stall watchdog, the clock programming
//! path and the hardware event callbacks.
//!
//! # Ownership
//!
//! | Counter | Written by | Reset by |
//! |---|---|---|
//! | `buffer_completions` | buffer-complete callback (open session only) | stream start / restart |
//! | `stall_polls` | stall watchdog | watchdog, stream start |
//! | `pib_errors`, `last_pib_error` | hardware-error callback | stream start |
//! | `i2c_failures` | clock bus path | stream start |
//! | `streaming_faults` | recovery path | stream start |
//!
//! # Buffer Sessions
//!
//! The buffer completion count is tagged with a session epoch. The epoch is
//! odd while a session is open and even while it is closed, and both halves
//! live in one 64-bit word. A completion callback observes the epoch once and
//! only counts while that same epoch is still current, so a callback from a
//! session that has since been closed or replaced never lands in the next
//! one.
//!
//! # Ordering
//!
//! Counters are independent monotonic values, so every access uses
//! `Ordering::Relaxed`. A [`CounterSnapshot`] is therefore not an atomic
//! snapshot across all fields; it is suitable for diagnostics, not for
//! correctness-critical decisions that span several counters.

use portable_atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};

/// Counter snapshot returned by [`StreamCounters::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// DMA buffers completed since the last stream start
    pub buffer_completions: u32,
    /// Consecutive watchdog polls that observed a stall
    pub stall_polls: u32,
    /// Parallel-interface (capture) error events
    pub pib_errors: u32,
    /// Argument of the most recent capture error event
    pub last_pib_error: u16,
    /// Register bus failures
    pub i2c_failures: u32,
    /// Recoveries performed by the stall watchdog
    pub streaming_faults: u32,
}

/// Buffer counting session as observed by a completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSession(u32);

impl BufferSession {
    /// Session epoch.
    #[inline]
    #[must_use]
    pub const fn epoch(self) -> u32 {
        self.0
    }

    /// Whether completions are being counted in this session.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        self.0 & 1 == 1
    }
}

#[inline]
fn pack_session(epoch: u32, count: u32) -> u64 {
    (u64::from(epoch) << 32) | u64::from(count)
}

#[inline]
fn session_epoch(word: u64) -> u32 {
    let [e3, e2, e1, e0, ..] = word.to_be_bytes();
    u32::from_be_bytes([e3, e2, e1, e0])
}

#[inline]
fn session_count(word: u64) -> u32 {
    let [.., c3, c2, c1, c0] = word.to_be_bytes();
    u32::from_be_bytes([c3, c2, c1, c0])
}

// Next odd epoch; skips the current one if it is already open.
#[inline]
fn next_open_epoch(epoch: u32) -> u32 {
    if epoch & 1 == 1 {
        epoch.wrapping_add(2)
    } else {
        epoch.wrapping_add(1)
    }
}

/// Atomic counters for the streaming pipeline.
///
/// # Callback Safety
///
/// `inc_buffer_complete`, `record_pib_error` and `inc_i2c_failure` are safe to
/// call from an interrupt-like callback context: each is a short bounded
/// sequence of atomic instructions, never blocks and never allocates.
///
/// # Example
///
/// ```rust
/// use rxfe_atomic::StreamCounters;
///
/// let counters = StreamCounters::new();
/// assert_eq!(counters.inc_buffer_complete(), None);
///
/// counters.begin_buffer_session();
/// assert_eq!(counters.inc_buffer_complete(), Some(1));
/// assert_eq!(counters.inc_buffer_complete(), Some(2));
///
/// counters.reset_session();
/// assert_eq!(counters.buffer_completions(), 0);
/// ```
#[derive(Debug)]
pub struct StreamCounters {
    buffer_session: AtomicU64,
    stall_polls: AtomicU32,
    pib_errors: AtomicU32,
    last_pib_error: AtomicU16,
    i2c_failures: AtomicU32,
    streaming_faults: AtomicU32,
}

impl Default for StreamCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamCounters {
    /// Create a counter block with every counter at zero and no buffer
    /// session open.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer_session: AtomicU64::new(0),
            stall_polls: AtomicU32::new(0),
            pib_errors: AtomicU32::new(0),
            last_pib_error: AtomicU16::new(0),
            i2c_failures: AtomicU32::new(0),
            streaming_faults: AtomicU32::new(0),
        }
    }

    /// Create a counter block with initial values.
    ///
    /// A buffer session is opened so the restored count keeps counting.
    /// Useful for testing or for resuming from a previous state.
    #[must_use]
    pub fn with_values(snapshot: CounterSnapshot) -> Self {
        Self {
            buffer_session: AtomicU64::new(pack_session(1, snapshot.buffer_completions)),
            stall_polls: AtomicU32::new(snapshot.stall_polls),
            pib_errors: AtomicU32::new(snapshot.pib_errors),
            last_pib_error: AtomicU16::new(snapshot.last_pib_error),
            i2c_failures: AtomicU32::new(snapshot.i2c_failures),
            streaming_faults: AtomicU32::new(snapshot.streaming_faults),
        }
    }

    /// Current buffer session.
    #[inline]
    #[must_use]
    pub fn buffer_session(&self) -> BufferSession {
        BufferSession(session_epoch(self.buffer_session.load(Ordering::Relaxed)))
    }

    /// Open a new buffer session with the count at zero.
    ///
    /// Any session observed before this call, open or not, is invalidated.
    pub fn begin_buffer_session(&self) -> BufferSession {
        let previous = self
            .buffer_session
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |word| {
                Some(pack_session(next_open_epoch(session_epoch(word)), 0))
            })
            .unwrap_or_else(|word| word);
        BufferSession(next_open_epoch(session_epoch(previous)))
    }

    /// Close the current buffer session, keeping its final count readable.
    ///
    /// Returns the final count. Closing a closed session changes nothing.
    pub fn end_buffer_session(&self) -> u32 {
        let result = self
            .buffer_session
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |word| {
                let epoch = session_epoch(word);
                (epoch & 1 == 1).then(|| pack_session(epoch.wrapping_add(1), session_count(word)))
            });
        match result {
            Ok(word) | Err(word) => session_count(word),
        }
    }

    /// Count one completed DMA buffer in the current session and return the
    /// new total, or `None` if no session is open.
    ///
    /// The total wraps at `u32::MAX`.
    #[inline]
    pub fn inc_buffer_complete(&self) -> Option<u32> {
        self.inc_buffer_complete_in(self.buffer_session())
    }

    /// Count one completed DMA buffer against `session`.
    ///
    /// Returns `None` without counting if `session` is closed or is no
    /// longer the current session.
    #[inline]
    pub fn inc_buffer_complete_in(&self, session: BufferSession) -> Option<u32> {
        if !session.is_open() {
            return None;
        }
        self.buffer_session
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |word| {
                (session_epoch(word) == session.0)
                    .then(|| pack_session(session.0, session_count(word).wrapping_add(1)))
            })
            .ok()
            .map(|previous| session_count(previous).wrapping_add(1))
    }

    /// Buffers completed in the current or most recent session.
    #[inline]
    #[must_use]
    pub fn buffer_completions(&self) -> u32 {
        session_count(self.buffer_session.load(Ordering::Relaxed))
    }

    /// Count one stalled watchdog poll and return the new run length.
    #[inline]
    pub fn inc_stall_poll(&self) -> u32 {
        self.stall_polls
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1)
    }

    /// Current run of consecutive stalled polls.
    #[inline]
    #[must_use]
    pub fn stall_polls(&self) -> u32 {
        self.stall_polls.load(Ordering::Relaxed)
    }

    /// End the current run of stalled polls.
    #[inline]
    pub fn clear_stall_polls(&self) {
        self.stall_polls.store(0, Ordering::Relaxed);
    }

    /// Record a capture-interface error event carrying `arg`.
    #[inline]
    pub fn record_pib_error(&self, arg: u16) {
        self.pib_errors.fetch_add(1, Ordering::Relaxed);
        self.last_pib_error.store(arg, Ordering::Relaxed);
    }

    /// Capture-interface error events since the last stream start.
    #[inline]
    #[must_use]
    pub fn pib_errors(&self) -> u32 {
        self.pib_errors.load(Ordering::Relaxed)
    }

    /// Argument of the most recent capture-interface error event.
    #[inline]
    #[must_use]
    pub fn last_pib_error(&self) -> u16 {
        self.last_pib_error.load(Ordering::Relaxed)
    }

    /// Count one register bus failure.
    #[inline]
    pub fn inc_i2c_failure(&self) {
        self.i2c_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Register bus failures since the last stream start.
    #[inline]
    #[must_use]
    pub fn i2c_failures(&self) -> u32 {
        self.i2c_failures.load(Ordering::Relaxed)
    }

    /// Count one watchdog recovery.
    #[inline]
    pub fn inc_streaming_fault(&self) {
        self.streaming_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Watchdog recoveries since the last stream start.
    #[inline]
    #[must_use]
    pub fn streaming_faults(&self) -> u32 {
        self.streaming_faults.load(Ordering::Relaxed)
    }

    /// Zero every counter and open a fresh buffer session.
    ///
    /// Called by the streaming controller as part of an external start.
    pub fn reset_session(&self) -> BufferSession {
        self.stall_polls.store(0, Ordering::Relaxed);
        self.pib_errors.store(0, Ordering::Relaxed);
        self.last_pib_error.store(0, Ordering::Relaxed);
        self.i2c_failures.store(0, Ordering::Relaxed);
        self.streaming_faults.store(0, Ordering::Relaxed);
        self.begin_buffer_session()
    }

    /// Read every counter without resetting.
    ///
    /// Each field is read atomically on its own; the set is not.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            buffer_completions: self.buffer_completions(),
            stall_polls: self.stall_polls.load(Ordering::Relaxed),
            pib_errors: self.pib_errors.load(Ordering::Relaxed),
            last_pib_error: self.last_pib_error.load(Ordering::Relaxed),
            i2c_failures: self.i2c_failures.load(Ordering::Relaxed),
            streaming_faults: self.streaming_faults.load(Ordering::Relaxed),
        }
    }
}
