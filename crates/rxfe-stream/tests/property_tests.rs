//! Property-based tests for pipeline invariants under arbitrary event orders.

#![cfg(test)]

use std::sync::Arc;

use proptest::prelude::*;
use rxfe_hal::{CaptureState, SimulatedFrontend};
use rxfe_stream::prelude::*;

#[derive(Debug, Clone)]
enum Event {
    Begin,
    End,
    Complete,
    HardwareError(u16),
    Tick,
    Backpressure(bool),
    Lock(bool),
    Recover(bool),
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        2 => Just(Event::Begin),
        1 => Just(Event::End),
        4 => Just(Event::Complete),
        1 => any::<u16>().prop_map(Event::HardwareError),
        4 => Just(Event::Tick),
        1 => any::<bool>().prop_map(Event::Backpressure),
        1 => any::<bool>().prop_map(Event::Lock),
        1 => any::<bool>().prop_map(Event::Recover),
    ]
}

fn apply(sim: &SimulatedFrontend, frontend: &Frontend, event: &Event) {
    match event {
        Event::Begin => {
            frontend.dispatch(Command::BeginStreaming);
        }
        Event::End => {
            frontend.dispatch(Command::EndStreaming);
        }
        Event::Complete => {
            frontend.on_buffer_complete();
        }
        Event::HardwareError(code) => frontend.on_hardware_error(*code),
        Event::Tick => {
            frontend.watchdog().tick();
        }
        Event::Backpressure(on) => {
            sim.force_capture_state(on.then_some(CaptureState::WAIT_THREAD0));
        }
        Event::Lock(locked) => sim.set_pll_locked(*locked),
        Event::Recover(restart) => {
            frontend.controller().internal_recover(*restart);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_pipeline_invariants_hold(events in proptest::collection::vec(event(), 1..120)) {
        let sim = Arc::new(SimulatedFrontend::new());
        let frontend = Frontend::new(sim.clone(), sim.clone(), FrontendConfig::default())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(frontend.dispatch(Command::SetClockFrequency(64_000_000)), Response::Ack);

        for event in &events {
            let state_before = frontend.state();
            let count_before = frontend.counters().buffer_completions();
            let faults_before = frontend.counters().streaming_faults();

            apply(&sim, &frontend, event);

            let state_after = frontend.state();
            let counters = frontend.counters().snapshot();

            // Recovering is never observable outside a recovery sequence.
            prop_assert_ne!(state_after, PipelineState::Recovering);
            if counters.stall_polls != 0 {
                prop_assert_eq!(state_after, PipelineState::Streaming);
            }
            if matches!(event, Event::Complete) && state_before != PipelineState::Streaming {
                prop_assert_eq!(counters.buffer_completions, count_before);
            }
            if matches!(event, Event::Recover(_)) {
                let expected = faults_before + u32::from(state_before == PipelineState::Streaming);
                prop_assert_eq!(counters.streaming_faults, expected);
            }
            prop_assert_eq!(sim.is_running(), state_after == PipelineState::Streaming);
            prop_assert_eq!(
                frontend.counters().buffer_session().is_open(),
                state_after == PipelineState::Streaming
            );
        }
    }

    #[test]
    fn prop_unknown_opcodes_rejected(request in any::<u8>(), value in any::<u32>()) {
        let known = [0xAA, 0xAB, 0xB2, 0xB3];
        let decoded = Command::from_request(request, value);
        if known.contains(&request) {
            prop_assert!(decoded.is_ok());
        } else {
            prop_assert_eq!(decoded, Err(CommandError::UnknownOpcode(request)));
        }
    }

    #[test]
    fn prop_stall_needs_threshold_polls(threshold in 1u32..8, extra in 0u32..4) {
        let sim = Arc::new(SimulatedFrontend::new());
        let config = FrontendConfig::builder()
            .stall_threshold(threshold)
            .build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let frontend = Frontend::new(sim.clone(), sim.clone(), config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(frontend.dispatch(Command::SetClockFrequency(40_000_000)), Response::Ack);
        prop_assert_eq!(frontend.dispatch(Command::BeginStreaming), Response::Ack);
        frontend.on_buffer_complete();
        prop_assert_eq!(frontend.watchdog().tick(), TickOutcome::Healthy);
        sim.force_capture_state(Some(CaptureState::FULL_THREAD0));

        for poll in 1..threshold {
            prop_assert_eq!(frontend.watchdog().tick(), TickOutcome::Stalled { polls: poll });
        }
        prop_assert_eq!(
            frontend.watchdog().tick(),
            TickOutcome::Recovered(RecoveryOutcome::Restarted)
        );
        // Restart zeroes the counter, so further frozen polls are startup latency.
        for _ in 0..extra {
            prop_assert_eq!(frontend.watchdog().tick(), TickOutcome::Healthy);
        }
        prop_assert_eq!(frontend.counters().streaming_faults(), 1);
    }
}
