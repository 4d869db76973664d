//! Collection Property Tests
//!
//! Checks the change-log views against plain `Vec` folds over randomly
//! generated edit sequences.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use ripple_core::{ArrayChange, ArrayWithHistory, Cell, ChangeList, FilterDiff, Predicate, Runtime};

/// Turn raw seeds into edits that are valid for an array of `len` elements.
fn valid_edits(mut len: usize, seeds: &[(bool, usize, i32)]) -> Vec<ArrayChange<i32>> {
    seeds
        .iter()
        .map(|&(insert, position, value)| {
            if insert || len == 0 {
                len += 1;
                ArrayChange::insert(value, position % len)
            } else {
                len -= 1;
                ArrayChange::remove(position % (len + 1))
            }
        })
        .collect()
}

fn fold(initial: &[i32], edits: &[ArrayChange<i32>]) -> Vec<i32> {
    let mut array = initial.to_vec();
    for edit in edits {
        edit.apply_to(&mut array);
    }
    array
}

/// Every edit recorded in a collection's log, in order.
fn logged<A: Clone + 'static>(history: &ArrayWithHistory<A>) -> Vec<ArrayChange<A>> {
    let mut edits = Vec::new();
    let mut link = history.changes();
    loop {
        let next = match &link.get() {
            ChangeList::Cons(edit, next) => {
                edits.push(edit.clone());
                next.clone()
            }
            ChangeList::Empty => return edits,
        };
        link = next;
    }
}

fn arb_initial() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-50..50_i32, 0..12)
}

fn arb_seeds() -> impl Strategy<Value = Vec<(bool, usize, i32)>> {
    prop::collection::vec((any::<bool>(), 0..64_usize, -50..50_i32), 0..24)
}

proptest! {
    /// Replay: a late observer sees the fold of every earlier edit.
    #[test]
    fn observe_replays_history(initial in arb_initial(), seeds in arb_seeds()) {
        let runtime = Runtime::new();
        let history = runtime.array(initial.clone());
        let edits = valid_edits(initial.len(), &seeds);
        for edit in &edits {
            history.change(edit.clone());
        }

        let current = Rc::new(RefCell::new(Vec::new()));
        let sink = current.clone();
        let _subscription =
            history.observe(move |array| *sink.borrow_mut() = array.to_vec(), |_| {});

        let expected = fold(&initial, &edits);
        prop_assert_eq!(&*current.borrow(), &expected);
        prop_assert_eq!(history.snapshot(), expected.clone());
        prop_assert_eq!(history.latest().get(), expected);
    }

    /// Live tracking: latest created up front follows every edit.
    #[test]
    fn latest_follows_live_edits(initial in arb_initial(), seeds in arb_seeds()) {
        let runtime = Runtime::new();
        let history = runtime.array(initial.clone());
        let latest = history.latest();
        let mut expected = initial.clone();

        for edit in valid_edits(initial.len(), &seeds) {
            edit.apply_to(&mut expected);
            history.change(edit);
            prop_assert_eq!(latest.get(), expected.clone());
        }
    }

    /// Map keeps the log's length, kinds and positions.
    #[test]
    fn map_preserves_structure(initial in arb_initial(), seeds in arb_seeds(), split in 0..24_usize) {
        let runtime = Runtime::new();
        let history = runtime.array(initial.clone());
        let edits = valid_edits(initial.len(), &seeds);
        let split = split.min(edits.len());

        // Part of the log exists before the view, part arrives after.
        for edit in &edits[..split] {
            history.change(edit.clone());
        }
        let labels = history.map(|n| n.to_string());
        for edit in &edits[split..] {
            history.change(edit.clone());
        }

        let mapped = logged(&labels);
        prop_assert_eq!(mapped.len(), edits.len());
        for (source, label) in edits.iter().zip(&mapped) {
            prop_assert_eq!(label, &source.map(|n| n.to_string()));
        }
        prop_assert_eq!(
            labels.snapshot(),
            fold(&initial, &edits).iter().map(|n| n.to_string()).collect::<Vec<_>>()
        );
    }

    /// Filter agrees with filtering the latest snapshot, and both diff
    /// strategies write identical logs.
    #[test]
    fn filter_tracks_edits_and_switches(
        initial in arb_initial(),
        seeds in arb_seeds(),
        switches in prop::collection::vec(0..3_usize, 24),
    ) {
        let predicates = [
            Predicate::new(|n: &i32| n % 2 == 0),
            Predicate::new(|n: &i32| *n < 0),
            Predicate::new(|n: &i32| n % 3 != 0),
        ];

        let runtime = Runtime::new();
        let history = runtime.array(initial.clone());
        let predicate = runtime.cell(predicates[0].clone());
        let rescan = history.filter_with(&predicate, FilterDiff::Rescan).get();
        let running = history.filter_with(&predicate, FilterDiff::Running).get();
        let rescan_latest = rescan.latest();

        let mut active = 0;
        let mut expected = initial.clone();
        for (edit, switch) in valid_edits(initial.len(), &seeds).into_iter().zip(&switches) {
            edit.apply_to(&mut expected);
            history.change(edit);
            if *switch != active {
                active = *switch;
                predicate.write(predicates[active].clone());
            }

            let kept: Vec<i32> = expected
                .iter()
                .copied()
                .filter(|n| predicates[active].test(n))
                .collect();
            prop_assert_eq!(rescan_latest.get(), kept);
        }

        prop_assert_eq!(logged(&rescan), logged(&running));
    }
}

/// The worked example: even to odd, then an edit the filter drops.
#[test]
fn filter_switches_from_even_to_odd() {
    let runtime = Runtime::new();
    let numbers = runtime.array(vec![1, 2, 3, 4, 5]);
    let predicate = runtime.cell(Predicate::new(|n: &i32| n % 2 == 0));
    let filtered: Cell<ArrayWithHistory<i32>> = numbers.filter(&predicate);
    assert!(filtered.is_constant());

    let view = filtered.get();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (initial, edits) = (seen.clone(), seen.clone());
    let _subscription = view.observe(
        move |current| initial.borrow_mut().extend_from_slice(current),
        move |edit| edit.apply_to(&mut edits.borrow_mut()),
    );
    assert_eq!(*seen.borrow(), vec![2, 4]);

    predicate.write(Predicate::new(|n: &i32| n % 2 != 0));
    assert_eq!(*seen.borrow(), vec![1, 3, 5]);

    numbers.change(ArrayChange::insert(6, 5));
    assert_eq!(*seen.borrow(), vec![1, 3, 5]);
    assert_eq!(logged(&view).len(), 5);
}

/// Reduce folds each edit once, however the edits are batched.
#[test]
fn reduce_counts_each_edit_once() {
    let runtime = Runtime::new();
    let history = runtime.array(Vec::<char>::new());
    let length = history.reduce(0_i64, |len, edit| match edit {
        ArrayChange::Insert { .. } => len + 1,
        ArrayChange::Remove { .. } => len - 1,
    });

    // Three edits appended from inside a single round.
    let trigger = runtime.cell(false);
    let writer = history.clone();
    let _batch = trigger.observe(move |go| {
        if *go {
            writer.change(ArrayChange::insert('a', 0));
            writer.change(ArrayChange::insert('b', 1));
            writer.change(ArrayChange::remove(0));
        }
    });
    let seen = Rc::new(RefCell::new(Vec::new()));
    let record = seen.clone();
    let _observer = length.observe(move |len| record.borrow_mut().push(*len));

    trigger.write(true);
    assert_eq!(length.get(), 1);
    assert_eq!(*seen.borrow(), vec![0, 1]);
}
