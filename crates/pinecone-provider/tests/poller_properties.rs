//! Property tests for the readiness poller
//!
//! Arbitrary status sequences are replayed with a zero interval on a
//! current-thread runtime.

use pinecone_core::{PineconeError, StatusSnapshot};
use pinecone_provider::{ReadinessError, ReadinessPoller};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    Pending(String),
    ReadyState,
    ReadyFlag(String),
    Error,
}

impl Step {
    fn is_terminal(&self) -> bool {
        !matches!(self, Step::Pending(_))
    }

    fn to_result(&self) -> pinecone_core::Result<StatusSnapshot> {
        match self {
            Step::Pending(state) => Ok(StatusSnapshot::new(state.clone(), false)),
            Step::ReadyState => Ok(StatusSnapshot::new("Ready", false)),
            Step::ReadyFlag(state) => Ok(StatusSnapshot::new(state.clone(), true)),
            Step::Error => Err(PineconeError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }),
        }
    }
}

fn pending_state() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Initializing".to_string()),
        Just("ScalingUp".to_string()),
        Just("Terminating".to_string()),
        Just(String::new()),
        "[a-z]{1,12}",
    ]
    .prop_filter("not the ready state", |state| state != "Ready")
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => pending_state().prop_map(Step::Pending),
        1 => Just(Step::ReadyState),
        1 => pending_state().prop_map(Step::ReadyFlag),
        1 => Just(Step::Error),
    ]
}

/// Replay `steps` (the last one repeats) and count the queries issued
fn replay(steps: &[Step]) -> (Result<StatusSnapshot, ReadinessError>, usize) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let calls = AtomicUsize::new(0);
    let poller = ReadinessPoller::new(Duration::ZERO);
    let result = runtime.block_on(poller.wait_until_ready("prop", || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let step = steps[n.min(steps.len() - 1)].clone();
        async move { step.to_result() }
    }));

    (result, calls.load(Ordering::SeqCst))
}

proptest! {
    #[test]
    fn prop_stops_at_first_terminal_step(
        mut steps in prop::collection::vec(step(), 1..20),
        last in step().prop_filter("terminal", Step::is_terminal),
    ) {
        steps.push(last);
        let first_terminal = steps.iter().position(Step::is_terminal).unwrap();

        let (result, calls) = replay(&steps);

        prop_assert_eq!(calls, first_terminal + 1);
        match &steps[first_terminal] {
            Step::Error => {
                let is_query_error = matches!(result, Err(ReadinessError::Query { .. }));
                prop_assert!(is_query_error);
            }
            _ => prop_assert!(result.unwrap().is_ready()),
        }
    }

    #[test]
    fn prop_pending_prefix_is_fully_consumed(
        pending in prop::collection::vec(pending_state(), 0..30),
    ) {
        let mut steps: Vec<Step> = pending.into_iter().map(Step::Pending).collect();
        let expected_calls = steps.len() + 1;
        steps.push(Step::ReadyState);

        let (result, calls) = replay(&steps);

        prop_assert_eq!(calls, expected_calls);
        prop_assert_eq!(result.unwrap().state, "Ready");
    }

    #[test]
    fn prop_ready_is_a_disjunction(state in "[A-Za-z]{0,12}", ready in any::<bool>()) {
        let snapshot = StatusSnapshot::new(state.clone(), ready);
        prop_assert_eq!(snapshot.is_ready(), state == "Ready" || ready);
    }
}
