//! Divider chain planning.
//!
//! A target frequency is produced as
//!
//! ```text
//! f_out = crystal * (a + b / c) / divider / 2^r_div_shift
//! ```
//!
//! where the PLL runs close to its 900 MHz ceiling, the multisynth divider is
//! an even integer and any target below 1 MHz is reached through the R
//! divider. Planning is pure: nothing here touches a bus.

use core::ops::RangeInclusive;

use crate::error::{SynthesisError, SynthesisResult};
use crate::registers::{
    OutputDivider, PARAM_BLOCK_LEN, PllRatio, decode_multisynth_registers, decode_pll_registers,
};

/// Default reference crystal frequency.
pub const DEFAULT_CRYSTAL_HZ: u32 = 27_000_000;
/// Highest PLL (VCO) frequency the divider chain aims for.
pub const MAX_PLL_HZ: u64 = 900_000_000;
/// Targets below this are doubled into range and divided back down by R.
pub const MIN_MULTISYNTH_HZ: u64 = 1_000_000;
/// Fixed fractional denominator (20 bits, all ones).
pub const FRACTIONAL_DENOMINATOR: u32 = 1_048_575;
/// Legal PLL feedback multipliers.
pub const MULTIPLIER_RANGE: RangeInclusive<u32> = 15..=90;
/// Legal integer multisynth dividers.
pub const DIVIDER_RANGE: RangeInclusive<u32> = 4..=2048;
/// Largest R divider exponent (divide by 128).
pub const MAX_R_DIV_SHIFT: u8 = 7;

/// Parameters for one output frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockParameters {
    /// PLL feedback integer part, `a`.
    pub multiplier: u32,
    /// PLL feedback numerator, `b`.
    pub numerator: u32,
    /// PLL feedback denominator, `c`.
    pub denominator: u32,
    /// Even integer multisynth divider.
    pub divider: u32,
    /// R divider exponent.
    pub r_div_shift: u8,
}

impl ClockParameters {
    /// Plan the divider chain for `target_hz` from a `crystal_hz` reference.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::OutOfRange`] if the target needs an R shift
    /// above 7, an even divider outside `4..=2048` or a multiplier outside
    /// `15..=90`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rxfe_clock::ClockParameters;
    ///
    /// let params = ClockParameters::compute(64_000_000, 27_000_000)?;
    /// assert_eq!(params.divider, 14);
    /// assert_eq!(params.r_div_shift, 0);
    /// # Ok::<(), rxfe_clock::SynthesisError>(())
    /// ```
    pub fn compute(target_hz: u32, crystal_hz: u32) -> SynthesisResult<Self> {
        if target_hz == 0 {
            return Err(SynthesisError::out_of_range(target_hz, "zero output frequency"));
        }
        if crystal_hz == 0 {
            return Err(SynthesisError::invalid_configuration(
                "crystal frequency must be non-zero",
            ));
        }

        let mut working = u64::from(target_hz);
        let mut r_div_shift = 0u8;
        while working < MIN_MULTISYNTH_HZ {
            if r_div_shift == MAX_R_DIV_SHIFT {
                return Err(SynthesisError::out_of_range(
                    target_hz,
                    "below minimum output frequency",
                ));
            }
            working *= 2;
            r_div_shift += 1;
        }

        let divider = u32::try_from((MAX_PLL_HZ / working) & !1)
            .map_err(|_| SynthesisError::out_of_range(target_hz, "divider overflow"))?;
        if divider < *DIVIDER_RANGE.start() {
            return Err(SynthesisError::out_of_range(
                target_hz,
                "above maximum output frequency",
            ));
        }
        if divider > *DIVIDER_RANGE.end() {
            return Err(SynthesisError::out_of_range(target_hz, "divider above 2048"));
        }

        let pll_hz = u64::from(divider) * working;
        let crystal = u64::from(crystal_hz);
        let multiplier = u32::try_from(pll_hz / crystal)
            .map_err(|_| SynthesisError::out_of_range(target_hz, "multiplier overflow"))?;
        if !MULTIPLIER_RANGE.contains(&multiplier) {
            return Err(SynthesisError::out_of_range(
                target_hz,
                "PLL multiplier outside 15..=90",
            ));
        }
        let remainder = pll_hz % crystal;
        // remainder < crystal, so the quotient is below the denominator
        let numerator = u32::try_from(remainder * u64::from(FRACTIONAL_DENOMINATOR) / crystal)
            .map_err(|_| SynthesisError::out_of_range(target_hz, "numerator overflow"))?;

        Ok(Self {
            multiplier,
            numerator,
            denominator: FRACTIONAL_DENOMINATOR,
            divider,
            r_div_shift,
        })
    }

    /// Rebuild parameters from the PLL and multisynth register images.
    ///
    /// Returns `None` if the PLL block has a zero denominator.
    #[must_use]
    pub fn from_registers(
        pll: &[u8; PARAM_BLOCK_LEN],
        multisynth: &[u8; PARAM_BLOCK_LEN],
    ) -> Option<Self> {
        let ratio = decode_pll_registers(pll)?;
        let output = decode_multisynth_registers(multisynth);
        Some(Self {
            multiplier: ratio.multiplier,
            numerator: ratio.numerator,
            denominator: ratio.denominator,
            divider: output.divider,
            r_div_shift: output.r_div_shift,
        })
    }

    /// PLL feedback ratio part of the parameters.
    #[must_use]
    pub fn pll_ratio(&self) -> PllRatio {
        PllRatio {
            multiplier: self.multiplier,
            numerator: self.numerator,
            denominator: self.denominator,
        }
    }

    /// Output divider part of the parameters.
    #[must_use]
    pub fn output_divider(&self) -> OutputDivider {
        OutputDivider {
            divider: self.divider,
            r_div_shift: self.r_div_shift,
        }
    }

    /// PLL (VCO) frequency these parameters produce from `crystal_hz`.
    #[must_use]
    pub fn pll_frequency_hz(&self, crystal_hz: u32) -> f64 {
        let ratio = f64::from(self.multiplier)
            + f64::from(self.numerator) / f64::from(self.denominator.max(1));
        f64::from(crystal_hz) * ratio
    }

    /// Output frequency these parameters produce from `crystal_hz`.
    #[must_use]
    pub fn effective_frequency_hz(&self, crystal_hz: u32) -> f64 {
        let post = f64::from(self.divider.max(1)) * f64::from(1u32 << self.r_div_shift.min(31));
        self.pll_frequency_hz(crystal_hz) / post
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_ratio() -> Result<(), SynthesisError> {
        // 900 MHz / 27 MHz = 33.333..., divider 36 at 25 MHz
        let params = ClockParameters::compute(25_000_000, DEFAULT_CRYSTAL_HZ)?;
        assert_eq!(params.divider, 36);
        assert_eq!(params.multiplier, 33);
        assert_eq!(params.numerator, 349_525);
        assert_eq!(params.r_div_shift, 0);
        Ok(())
    }

    #[test]
    fn test_divider_rounded_down_to_even() -> Result<(), SynthesisError> {
        // 900 / 64 = 14.06 -> 14
        let params = ClockParameters::compute(64_000_000, DEFAULT_CRYSTAL_HZ)?;
        assert_eq!(params.divider, 14);
        assert_eq!(params.multiplier, 33);
        Ok(())
    }

    #[test]
    fn test_low_frequency_uses_r_divider() -> Result<(), SynthesisError> {
        let params = ClockParameters::compute(10_000, DEFAULT_CRYSTAL_HZ)?;
        assert_eq!(params.r_div_shift, 7);
        // 10 kHz * 128 = 1.28 MHz
        assert_eq!(params.divider, 702);
        Ok(())
    }

    #[test]
    fn test_below_r_divider_reach() {
        let err = ClockParameters::compute(7_000, DEFAULT_CRYSTAL_HZ);
        assert!(matches!(
            err,
            Err(SynthesisError::OutOfRange {
                target_hz: 7_000,
                ..
            })
        ));
    }

    #[test]
    fn test_above_pll_reach() {
        assert!(ClockParameters::compute(300_000_000, DEFAULT_CRYSTAL_HZ).is_err());
        assert!(ClockParameters::compute(225_000_000, DEFAULT_CRYSTAL_HZ).is_ok());
    }

    #[test]
    fn test_multiplier_range_enforced() {
        // 1 MHz crystal puts a 900 MHz PLL at a multiplier of 900
        assert!(ClockParameters::compute(10_000_000, 1_000_000).is_err());
    }

    #[test]
    fn test_zero_inputs_rejected() {
        assert!(ClockParameters::compute(0, DEFAULT_CRYSTAL_HZ).is_err());
        assert!(matches!(
            ClockParameters::compute(10_000_000, 0),
            Err(SynthesisError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_effective_frequency_close() -> Result<(), SynthesisError> {
        let params = ClockParameters::compute(40_000_000, DEFAULT_CRYSTAL_HZ)?;
        let error = (params.effective_frequency_hz(DEFAULT_CRYSTAL_HZ) - 40e6).abs();
        assert!(error < 1.0, "error {error} Hz");
        Ok(())
    }
}
