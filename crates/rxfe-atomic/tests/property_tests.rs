//! Property-based tests for stream counters.

#![cfg(test)]

use proptest::prelude::*;
use rxfe_atomic::{CounterSnapshot, StreamCounters};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_completions_strictly_increase(count in 1u32..500) {
        let counters = StreamCounters::new();
        counters.begin_buffer_session();
        let mut previous = 0u32;
        for _ in 0..count {
            let now = counters
                .inc_buffer_complete()
                .ok_or_else(|| TestCaseError::fail("session closed"))?;
            prop_assert!(now > previous);
            previous = now;
        }
        prop_assert_eq!(counters.buffer_completions(), count);
    }

    #[test]
    fn prop_reset_session_zeroes_everything(
        completions in 0u32..100,
        pib in 0u32..20,
        arg in any::<u16>(),
        faults in 0u32..5,
    ) {
        let counters = StreamCounters::new();
        counters.begin_buffer_session();
        for _ in 0..completions {
            counters.inc_buffer_complete();
        }
        for _ in 0..pib {
            counters.record_pib_error(arg);
        }
        for _ in 0..faults {
            counters.inc_streaming_fault();
        }

        counters.reset_session();
        prop_assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn prop_only_current_session_counts(restarts in 1usize..8, per_session in 0u32..50) {
        let counters = StreamCounters::new();
        let mut sessions = Vec::new();
        for _ in 0..restarts {
            counters.end_buffer_session();
            sessions.push(counters.begin_buffer_session());
        }
        let (current, stale) = sessions
            .split_last()
            .ok_or_else(|| TestCaseError::fail("no session"))?;

        for _ in 0..per_session {
            for session in stale {
                prop_assert_eq!(counters.inc_buffer_complete_in(*session), None);
            }
            prop_assert!(counters.inc_buffer_complete_in(*current).is_some());
        }
        prop_assert_eq!(counters.buffer_completions(), per_session);
    }
}
