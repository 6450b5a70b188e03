//! E2E: adds racing the first teardown.
//!
//! Validates:
//! 1. Every member added from any thread is released exactly once, whether
//!    the teardown captured it or the add released it immediately.
//! 2. Concurrent `release` calls perform exactly one teardown.
//! 3. No panics, no deadlocks, no unsafe code.
//!
//! Scenario: several adder threads push probes into one shared composite
//! while another thread tears it down partway through.

#![forbid(unsafe_code)]

use std::sync::{Arc, Barrier};
use std::thread;

use dispose_core::composite::CompositeDisposable;
use dispose_harness::probe::{Probe, ProbeHandle};
use dispose_harness::recording::RecordingSink;

const ADDERS: usize = 8;
const PER_ADDER: usize = 200;

#[test]
fn racing_adds_are_released_exactly_once() {
    for round in 0..10 {
        let composite = Arc::new(CompositeDisposable::new());
        let barrier = Arc::new(Barrier::new(ADDERS + 1));

        let adders: Vec<_> = (0..ADDERS)
            .map(|t| {
                let composite = Arc::clone(&composite);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut handles: Vec<ProbeHandle> = Vec::with_capacity(PER_ADDER);
                    for i in 0..PER_ADDER {
                        let (probe, handle) = Probe::ok(format!("r{round}-t{t}-{i}"));
                        composite.push(probe).unwrap();
                        handles.push(handle);
                    }
                    handles
                })
            })
            .collect();

        barrier.wait();
        thread::yield_now();
        composite.release().unwrap();

        let handles: Vec<ProbeHandle> = adders
            .into_iter()
            .flat_map(|h| h.join().expect("adder thread panicked"))
            .collect();

        assert_eq!(handles.len(), ADDERS * PER_ADDER);
        for handle in &handles {
            assert_eq!(handle.release_count(), 1, "{}", handle.name());
        }
        assert!(composite.is_empty());
    }
}

#[test]
fn concurrent_release_tears_down_once() {
    let sink = RecordingSink::new();
    let composite = Arc::new(CompositeDisposable::new().with_sink(sink.clone()));
    let mut handles = Vec::new();
    for i in 0..64 {
        let (probe, handle) = if i % 8 == 0 {
            Probe::failing(format!("f{i}"))
        } else {
            Probe::ok(format!("o{i}"))
        };
        composite.push(probe).unwrap();
        handles.push(handle);
    }

    let barrier = Arc::new(Barrier::new(4));
    let releasers: Vec<_> = (0..4)
        .map(|_| {
            let composite = Arc::clone(&composite);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                composite.release().err().map(|e| e.leaf_count())
            })
        })
        .collect();

    let outcomes: Vec<Option<usize>> = releasers
        .into_iter()
        .map(|h| h.join().expect("releaser thread panicked"))
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_some()).count(), 1);
    assert_eq!(outcomes.iter().flatten().sum::<usize>(), 8);
    assert!(handles.iter().all(|h| h.release_count() == 1));
    assert_eq!(sink.len(), 8);
}

#[test]
fn shared_child_released_by_parent_while_owner_adds() {
    let child = Arc::new(CompositeDisposable::new());
    let parent = CompositeDisposable::new();
    parent.add(Some(Arc::clone(&child).into_member())).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let owner = {
        let child = Arc::clone(&child);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            (0..500)
                .map(|i| {
                    let (probe, handle) = Probe::ok(format!("c{i}"));
                    child.push(probe).unwrap();
                    handle
                })
                .collect::<Vec<_>>()
        })
    };

    barrier.wait();
    parent.release().unwrap();
    let handles = owner.join().expect("owner thread panicked");

    assert!(child.is_torn_down());
    assert!(handles.iter().all(|h| h.release_count() == 1));
}
