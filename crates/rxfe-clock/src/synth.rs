//! Clock generator programming and lock monitoring.

use std::sync::Arc;

use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use rxfe_atomic::StreamCounters;
use rxfe_hal::{BusError, RegisterBus};
use serde::{Deserialize, Serialize};

use crate::error::{SynthesisError, SynthesisResult};
use crate::params::{ClockParameters, DEFAULT_CRYSTAL_HZ};
use crate::registers::{
    CLK0_ENABLE_PLL_A, CLK0_POWER_DOWN, PARAM_BLOCK_LEN, PLL_RESET_BOTH, REG_CLK0_CONTROL,
    REG_DEVICE_STATUS, REG_MS0_BASE, REG_PLL_A_BASE, REG_PLL_RESET, STATUS_LOL_A, burst,
    encode_multisynth_registers, encode_pll_registers,
};

/// Largest crystal correction accepted, in parts per billion (100 ppm).
pub const MAX_CORRECTION_PPB: i32 = 100_000;

/// Reference crystal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Nominal crystal frequency in Hz.
    pub crystal_hz: u32,
    /// Crystal error in parts per billion; positive means the crystal runs fast.
    pub correction_ppb: i32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            crystal_hz: DEFAULT_CRYSTAL_HZ,
            correction_ppb: 0,
        }
    }
}

impl SynthConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the crystal frequency is zero or the correction
    /// exceeds 100 ppm in either direction.
    pub fn validate(&self) -> SynthesisResult<()> {
        if self.crystal_hz == 0 {
            return Err(SynthesisError::invalid_configuration(
                "crystal_hz must be greater than 0",
            ));
        }
        if self.correction_ppb.unsigned_abs() > MAX_CORRECTION_PPB.unsigned_abs() {
            return Err(SynthesisError::invalid_configuration(format!(
                "correction_ppb must be within +/-{MAX_CORRECTION_PPB}, got {}",
                self.correction_ppb
            )));
        }
        Ok(())
    }

    /// Crystal frequency after applying the correction.
    #[must_use]
    pub fn corrected_crystal_hz(&self) -> u32 {
        let nominal = i64::from(self.crystal_hz);
        let offset = nominal * i64::from(self.correction_ppb) / 1_000_000_000;
        u32::try_from(nominal + offset).unwrap_or(self.crystal_hz)
    }
}

/// Clock health as seen by the preflight gate and the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockHealth {
    /// The last frequency-set call succeeded with a non-zero target.
    pub enabled: bool,
    /// PLL A reported lock on a live status read.
    pub locked: bool,
}

impl ClockHealth {
    /// Whether the clock is both enabled and locked.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.enabled && self.locked
    }
}

/// Sample clock driver for a Si5351-class generator on CLK0 / PLL A.
///
/// Programming calls are serialized internally. Lock queries are lock-free
/// live reads and may run concurrently with programming.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rxfe_atomic::StreamCounters;
/// use rxfe_clock::{ClockSynth, SynthConfig};
/// use rxfe_hal::SimulatedFrontend;
///
/// let device = Arc::new(SimulatedFrontend::new());
/// let counters = Arc::new(StreamCounters::new());
/// let clock = ClockSynth::new(device, SynthConfig::default(), counters)?;
///
/// clock.set_frequency(40_000_000)?;
/// assert!(clock.health().is_ready());
/// # Ok::<(), rxfe_clock::SynthesisError>(())
/// ```
pub struct ClockSynth {
    bus: Arc<dyn RegisterBus>,
    config: SynthConfig,
    counters: Arc<StreamCounters>,
    enabled: AtomicBool,
    program: Mutex<()>,
}

impl core::fmt::Debug for ClockSynth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClockSynth")
            .field("config", &self.config)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl ClockSynth {
    /// Create a driver. The output is considered disabled until the first
    /// successful [`set_frequency`](Self::set_frequency).
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        bus: Arc<dyn RegisterBus>,
        config: SynthConfig,
        counters: Arc<StreamCounters>,
    ) -> SynthesisResult<Self> {
        config.validate()?;
        Ok(Self {
            bus,
            config,
            counters,
            enabled: AtomicBool::new(false),
            program: Mutex::new(()),
        })
    }

    /// Synthesizer configuration.
    #[must_use]
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Plan the divider chain for `target_hz` without touching the bus.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::OutOfRange`] if the target cannot be produced.
    pub fn plan(&self, target_hz: u32) -> SynthesisResult<ClockParameters> {
        ClockParameters::compute(target_hz, self.config.corrected_crystal_hz())
    }

    /// Program CLK0 to `target_hz`, or power it down when `target_hz` is 0.
    ///
    /// The output counts as enabled only once the whole sequence has been
    /// written. Out-of-range targets are rejected before any register write.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::OutOfRange`] for an unreachable target, or
    /// [`SynthesisError::Bus`] for the first failed register write. Either way
    /// the output is left disabled.
    pub fn set_frequency(&self, target_hz: u32) -> SynthesisResult<()> {
        let _guard = self.program.lock();
        self.enabled.store(false, Ordering::Release);

        if target_hz == 0 {
            self.write(&[REG_CLK0_CONTROL, CLK0_POWER_DOWN])?;
            tracing::info!("Sample clock output disabled");
            return Ok(());
        }

        let params = self.plan(target_hz).inspect_err(|e| {
            tracing::warn!(target_hz, error = %e, "Rejected sample clock frequency");
        })?;

        let unencodable = || SynthesisError::out_of_range(target_hz, "parameters not encodable");
        let pll = encode_pll_registers(params.pll_ratio()).ok_or_else(unencodable)?;
        let multisynth =
            encode_multisynth_registers(params.output_divider()).ok_or_else(unencodable)?;

        self.write(&burst(REG_PLL_A_BASE, &pll))?;
        self.write(&burst(REG_MS0_BASE, &multisynth))?;
        self.write(&[REG_PLL_RESET, PLL_RESET_BOTH])?;
        self.write(&[REG_CLK0_CONTROL, CLK0_ENABLE_PLL_A])?;

        self.enabled.store(true, Ordering::Release);
        tracing::info!(
            target_hz,
            multiplier = params.multiplier,
            numerator = params.numerator,
            divider = params.divider,
            r_div_shift = params.r_div_shift,
            "Sample clock programmed"
        );
        Ok(())
    }

    /// Power down the output. Same as `set_frequency(0)`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Bus`] if the control write fails.
    pub fn disable(&self) -> SynthesisResult<()> {
        self.set_frequency(0)
    }

    /// Whether the last frequency-set call succeeded with a non-zero target.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Live PLL A lock query.
    ///
    /// A failed status read counts as a bus failure and reports unlocked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        match self.bus.read(REG_DEVICE_STATUS) {
            Ok(status) => status & STATUS_LOL_A == 0,
            Err(e) => {
                self.counters.inc_i2c_failure();
                tracing::warn!(error = %e, "Clock status read failed, treating as unlocked");
                false
            }
        }
    }

    /// Raw device status byte. Failures are returned, not counted.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the read fails.
    pub fn read_status(&self) -> Result<u8, BusError> {
        self.bus.read(REG_DEVICE_STATUS)
    }

    /// Enabled flag plus a live lock query.
    #[must_use]
    pub fn health(&self) -> ClockHealth {
        ClockHealth {
            enabled: self.is_enabled(),
            locked: self.is_locked(),
        }
    }

    /// Read the programmed PLL A and multisynth 0 blocks back from the device.
    ///
    /// Returns `Ok(None)` if the PLL block has never been programmed.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Bus`] for the first failed register read.
    pub fn read_back(&self) -> SynthesisResult<Option<ClockParameters>> {
        let pll = self.read_block(REG_PLL_A_BASE)?;
        let multisynth = self.read_block(REG_MS0_BASE)?;
        Ok(ClockParameters::from_registers(&pll, &multisynth))
    }

    fn read_block(&self, base: u8) -> SynthesisResult<[u8; PARAM_BLOCK_LEN]> {
        let mut block = [0u8; PARAM_BLOCK_LEN];
        for (register, byte) in (base..).zip(block.iter_mut()) {
            *byte = self.bus.read(register).map_err(|e| self.bus_failure(e))?;
        }
        Ok(block)
    }

    fn write(&self, bytes: &[u8]) -> SynthesisResult<()> {
        self.bus.write_sequence(bytes).map_err(|e| self.bus_failure(e))
    }

    fn bus_failure(&self, error: BusError) -> SynthesisError {
        self.counters.inc_i2c_failure();
        tracing::warn!(error = %error, "Clock generator bus transfer failed");
        SynthesisError::Bus(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxfe_hal::{HalOp, SimulatedFrontend};

    fn setup() -> Result<(Arc<SimulatedFrontend>, Arc<StreamCounters>, ClockSynth), SynthesisError>
    {
        let sim = Arc::new(SimulatedFrontend::new());
        let counters = Arc::new(StreamCounters::new());
        let clock = ClockSynth::new(sim.clone(), SynthConfig::default(), counters.clone())?;
        Ok((sim, counters, clock))
    }

    #[test]
    fn test_default_config_valid() {
        assert!(SynthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_crystal() {
        let config = SynthConfig {
            crystal_hz: 0,
            ..SynthConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_large_correction() {
        let config = SynthConfig {
            correction_ppb: -100_001,
            ..SynthConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_corrected_crystal() {
        let config = SynthConfig {
            crystal_hz: 27_000_000,
            correction_ppb: 10_000,
        };
        // +10 ppm of 27 MHz
        assert_eq!(config.corrected_crystal_hz(), 27_000_270);
        assert_eq!(SynthConfig::default().corrected_crystal_hz(), 27_000_000);
    }

    #[test]
    fn test_program_sequence() -> Result<(), SynthesisError> {
        let (sim, counters, clock) = setup()?;
        clock.set_frequency(32_000_000)?;

        assert!(clock.is_enabled());
        assert!(clock.is_locked());
        assert_eq!(sim.bus_write_count(), 4);
        assert_eq!(sim.register(REG_CLK0_CONTROL), CLK0_ENABLE_PLL_A);
        assert_eq!(counters.i2c_failures(), 0);
        Ok(())
    }

    #[test]
    fn test_bus_failure_aborts() -> Result<(), SynthesisError> {
        let (sim, counters, clock) = setup()?;
        sim.inject_fault(HalOp::BusWrite);

        let result = clock.set_frequency(32_000_000);
        assert!(matches!(result, Err(SynthesisError::Bus(_))));
        assert!(!clock.is_enabled());
        assert_eq!(sim.bus_write_count(), 1);
        assert_eq!(counters.i2c_failures(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_status_read_counts() -> Result<(), SynthesisError> {
        let (sim, counters, clock) = setup()?;
        sim.inject_fault(HalOp::BusRead);

        assert!(!clock.is_locked());
        assert_eq!(counters.i2c_failures(), 1);
        assert!(clock.read_status().is_err());
        assert_eq!(counters.i2c_failures(), 1);
        Ok(())
    }

    #[test]
    fn test_read_back_unprogrammed() -> Result<(), SynthesisError> {
        let (_sim, _counters, clock) = setup()?;
        assert_eq!(clock.read_back()?, None);
        Ok(())
    }
}
