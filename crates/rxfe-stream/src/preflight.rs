//! Admission check run before every externally commanded stream start.

use rxfe_clock::ClockSynth;

use crate::error::PreflightError;

/// Verify the sample clock is enabled and locked.
///
/// The enabled flag is checked first, so a disabled clock costs no bus
/// traffic. Neither check mutates hardware.
///
/// # Errors
///
/// Returns [`PreflightError::ClockDisabled`] or
/// [`PreflightError::ClockUnlocked`].
pub fn check(clock: &ClockSynth) -> Result<(), PreflightError> {
    if !clock.is_enabled() {
        tracing::warn!("Stream start refused: sample clock disabled");
        return Err(PreflightError::ClockDisabled);
    }
    if !clock.is_locked() {
        tracing::warn!("Stream start refused: sample clock PLL unlocked");
        return Err(PreflightError::ClockUnlocked);
    }
    Ok(())
}
