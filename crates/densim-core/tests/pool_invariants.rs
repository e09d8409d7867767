//! Property-based tests for the slot pool and qubit binding invariants.
//!
//! Random request sequences run against a small pool. Requests may fail
//! (capacity, unknown or duplicate refs); the invariants must hold after
//! every request regardless.

use densim_core::{
    GateMatrix, MeasurementMethod, QubitRef, Session, SessionConfig, Unitary2x2, Unitary4x4,
};
use densim_engine::testing::RecordingFactory;
use proptest::prelude::*;
use std::collections::HashSet;

const CAPACITY: usize = 3;
const REFS: u64 = 6;

/// Host requests over a handful of refs.
#[derive(Debug, Clone)]
enum Request {
    Allocate(u64),
    Free(u64),
    Single(u64),
    Two(u64, u64),
    Measure(u64, MeasurementMethod),
    Prep(u64),
}

fn arb_method() -> impl Strategy<Value = MeasurementMethod> {
    prop_oneof![
        Just(MeasurementMethod::Random),
        Just(MeasurementMethod::Probable),
        Just(MeasurementMethod::ForceZero),
        Just(MeasurementMethod::ForceOne),
    ]
}

fn arb_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        (0..REFS).prop_map(Request::Allocate),
        (0..REFS).prop_map(Request::Free),
        (0..REFS).prop_map(Request::Single),
        (0..REFS, 0..REFS).prop_map(|(a, b)| Request::Two(a, b)),
        (0..REFS, arb_method()).prop_map(|(q, m)| Request::Measure(q, m)),
        (0..REFS).prop_map(Request::Prep),
    ]
}

impl Request {
    fn apply(&self, s: &mut Session<RecordingFactory>) {
        let _ = match *self {
            Request::Allocate(q) => s.allocate(&[QubitRef(q)]),
            Request::Free(q) => s.free(&[QubitRef(q)]),
            Request::Single(q) => s.gate(&[QubitRef(q)], &GateMatrix::Single(Unitary2x2::h())),
            Request::Two(a, b) => s.gate(
                &[QubitRef(a), QubitRef(b)],
                &GateMatrix::Two(Unitary4x4::cz()),
            ),
            Request::Measure(q, m) => s.measure_with(&[QubitRef(q)], &[m]).map(|_| ()),
            Request::Prep(q) => s.prep(QubitRef(q)),
        };
    }
}

fn session() -> Session<RecordingFactory> {
    Session::new(SessionConfig::seeded(CAPACITY, 5), RecordingFactory::new()).unwrap()
}

proptest! {
    #[test]
    fn prop_pool_partition_and_exclusivity(requests in prop::collection::vec(arb_request(), 1..60)) {
        let mut s = session();
        for request in &requests {
            request.apply(&mut s);

            let pool = s.pool();
            prop_assert!(pool.check_partition());
            prop_assert_eq!(pool.num_free() + pool.num_live(), CAPACITY);

            let mut seen = HashSet::new();
            for q in (0..REFS).filter_map(|q| s.qubit(QubitRef(q))) {
                if let Some(slot) = q.slot() {
                    prop_assert!(seen.insert(slot), "slot {} bound twice", slot);
                    prop_assert!(pool.is_live(slot));
                }
            }
            prop_assert_eq!(seen.len(), pool.num_live());
            prop_assert!(s.check_invariants());
        }
    }

    #[test]
    fn prop_measurement_evicts(requests in prop::collection::vec(arb_request(), 1..30), q in 0..REFS) {
        let mut s = session();
        for request in &requests {
            request.apply(&mut s);
        }
        let Some(before) = s.qubit(QubitRef(q)).cloned() else {
            return Ok(());
        };

        let m = s.measure_with(&[QubitRef(q)], &[MeasurementMethod::Probable]).unwrap();
        let after = s.qubit(QubitRef(q)).unwrap();
        prop_assert_eq!(after.slot(), None);
        prop_assert_eq!(after.classical(), m[0].value);
        if let Some(slot) = before.slot() {
            prop_assert!(s.pool().is_free(slot));
        } else {
            prop_assert_eq!(m[0].probability, 1.0);
        }
    }

    #[test]
    fn prop_rebinding_current_slot_is_noop(requests in prop::collection::vec(arb_request(), 1..30)) {
        let mut s = session();
        for request in &requests {
            request.apply(&mut s);
        }
        let free_before = s.pool().num_free();
        let slots_before: Vec<_> = (0..REFS)
            .map(|q| s.qubit(QubitRef(q)).and_then(|q| q.slot()))
            .collect();

        // Gating a resident qubit again must keep its slot.
        for q in 0..REFS {
            if slots_before[q as usize].is_some() {
                s.gate(&[QubitRef(q)], &GateMatrix::Single(Unitary2x2::z())).unwrap();
            }
        }

        let slots_after: Vec<_> = (0..REFS)
            .map(|q| s.qubit(QubitRef(q)).and_then(|q| q.slot()))
            .collect();
        prop_assert_eq!(slots_before, slots_after);
        prop_assert_eq!(s.pool().num_free(), free_before);
    }
}
