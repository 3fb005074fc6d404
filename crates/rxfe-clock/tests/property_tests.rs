//! Property-based tests for divider planning and register readback.

#![cfg(test)]

use std::sync::Arc;

use proptest::prelude::*;
use rxfe_atomic::StreamCounters;
use rxfe_clock::prelude::*;
use rxfe_clock::registers::{CLK0_POWER_DOWN, OutputDivider, PllRatio, REG_CLK0_CONTROL};
use rxfe_clock::{encode_multisynth_registers, encode_pll_registers};
use rxfe_hal::{HalCall, SimulatedFrontend};

const CRYSTAL_HZ: u32 = 27_000_000;

fn new_clock(sim: &Arc<SimulatedFrontend>) -> Result<ClockSynth, SynthesisError> {
    ClockSynth::new(
        sim.clone(),
        SynthConfig::default(),
        Arc::new(StreamCounters::new()),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_register_readback_within_tolerance(target in 2_000_000u32..=64_000_000) {
        let sim = Arc::new(SimulatedFrontend::new());
        let clock = new_clock(&sim).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(clock.set_frequency(target).is_ok());

        let params = clock
            .read_back()
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .ok_or_else(|| TestCaseError::fail("PLL block not programmed"))?;
        let actual = params.effective_frequency_hz(CRYSTAL_HZ);
        let relative = (actual - f64::from(target)).abs() / f64::from(target);
        prop_assert!(
            relative <= 1.0 / f64::from(1u32 << 20),
            "target {} Hz decoded to {} Hz", target, actual
        );
    }

    #[test]
    fn prop_plan_respects_hardware_limits(target in 8_000u32..=225_000_000) {
        let params = ClockParameters::compute(target, CRYSTAL_HZ)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!((15..=90).contains(&params.multiplier));
        prop_assert!(params.numerator < params.denominator);
        prop_assert!((4..=2048).contains(&params.divider));
        prop_assert_eq!(params.divider % 2, 0);
        prop_assert!(params.r_div_shift <= 7);
        prop_assert!(params.pll_frequency_hz(CRYSTAL_HZ) <= 900_000_000.0);
    }

    #[test]
    fn prop_disable_is_single_write(prior in proptest::option::of(2_000_000u32..=64_000_000)) {
        let sim = Arc::new(SimulatedFrontend::new());
        let clock = new_clock(&sim).map_err(|e| TestCaseError::fail(e.to_string()))?;
        if let Some(hz) = prior {
            prop_assert!(clock.set_frequency(hz).is_ok());
        }
        sim.clear_calls();

        prop_assert!(clock.set_frequency(0).is_ok());
        prop_assert!(!clock.is_enabled());
        prop_assert_eq!(
            sim.calls(),
            vec![HalCall::BusWrite(vec![REG_CLK0_CONTROL, CLK0_POWER_DOWN])]
        );
    }

    #[test]
    fn prop_encoders_never_panic(
        multiplier in any::<u32>(),
        numerator in any::<u32>(),
        denominator in any::<u32>(),
        divider in any::<u32>(),
        r_div_shift in any::<u8>(),
    ) {
        let pll = encode_pll_registers(PllRatio { multiplier, numerator, denominator });
        let valid_ratio = (15..=90).contains(&multiplier)
            && numerator < denominator
            && denominator <= 1_048_575;
        prop_assert_eq!(pll.is_some(), valid_ratio);

        let multisynth = encode_multisynth_registers(OutputDivider { divider, r_div_shift });
        let valid_divider = (4..=2048).contains(&divider) && r_div_shift <= 7;
        prop_assert_eq!(multisynth.is_some(), valid_divider);
    }

    #[test]
    fn prop_planned_parameters_encode(target in 8_000u32..=225_000_000) {
        let params = ClockParameters::compute(target, CRYSTAL_HZ)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(encode_pll_registers(params.pll_ratio()).is_some());
        prop_assert!(encode_multisynth_registers(params.output_divider()).is_some());
    }
}
