//! Integration tests for the training windows.

use std::collections::HashMap;

use boxer_classifiers::config::{LearnerConfig, SuiteConfig, WindowConfig};
use boxer_classifiers::data_point::DataPoint;
use boxer_classifiers::error::Result;
use boxer_classifiers::session::{RawLabel, Session};
use boxer_classifiers::training_window::{
    build_window, run_to_completion, CyclicWindow, RandomizedWindow, TrainingWindow,
};

fn presentations(window: &mut dyn TrainingWindow<u32>, items: Vec<u32>) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    let mut sink = |x: &u32| -> Result<()> {
        *counts.entry(*x).or_insert(0) += 1;
        Ok(())
    };
    run_to_completion(window, &mut items.into_iter(), &mut sink).unwrap();
    counts
}

// ---------------------------------------------------------------------------
// Cyclic
// ---------------------------------------------------------------------------

#[test]
fn cyclic_w6_rep3_two_elements() {
    let mut window = CyclicWindow::new(6, 3).unwrap();
    let counts = presentations(&mut window, vec![1, 2]);
    assert_eq!(counts.get(&1), Some(&3));
    assert_eq!(counts.get(&2), Some(&3));
    assert_eq!(window.presented(), 6);
}

#[test]
fn cyclic_never_exceeds_repeat_on_long_sources() {
    let mut window = CyclicWindow::new(6, 3).unwrap();
    let counts = presentations(&mut window, (0..25).collect());
    assert_eq!(counts.len(), 25);
    assert!(counts.values().all(|&c| c == 3));
}

#[test]
fn cyclic_once_exhausted_stays_exhausted() {
    let mut window = CyclicWindow::new(2, 1).unwrap();
    presentations(&mut window, vec![7]);
    let mut sink = |_: &u32| -> Result<()> { Ok(()) };
    assert!(!window
        .absorb_next_example(&mut std::iter::empty(), &mut sink, true)
        .unwrap());
}

// ---------------------------------------------------------------------------
// Randomized
// ---------------------------------------------------------------------------

fn ordinals(seed: u64) -> Vec<u64> {
    let mut window = RandomizedWindow::new(10, 5, seed).unwrap();
    let mut out = Vec::new();
    let mut source = 0..30u32;
    let mut sink = |_: &u32| -> Result<()> { Ok(()) };
    while window.absorb_next_example(&mut source, &mut sink, true).unwrap() {
        out.push(window.last_presented().unwrap());
    }
    out
}

#[test]
fn randomized_same_seed_same_sequence() {
    let a = ordinals(1234);
    assert_eq!(a, ordinals(1234));
    assert_eq!(a.len(), 150);
    assert_ne!(a, ordinals(4321));
}

#[test]
fn randomized_presents_every_item_at_least_once() {
    let mut window = RandomizedWindow::new(4, 3, 9).unwrap();
    let counts = presentations(&mut window, (0..12).collect());
    assert_eq!(counts.len(), 12);
    assert_eq!(counts.values().sum::<usize>(), 36);
}

// ---------------------------------------------------------------------------
// Windows feeding a learner
// ---------------------------------------------------------------------------

#[test]
fn session_trains_through_a_window() {
    let mut session = Session::new(SuiteConfig::default(), LearnerConfig::default()).unwrap();
    let points: Vec<DataPoint> = (0..4)
        .map(|i| {
            let word = if i % 2 == 0 { "even" } else { "odd" };
            let label: RawLabel = format!("parity:{}", word).parse().unwrap();
            session
                .make_point(None, &[(word, 1.0)], &[label], true)
                .unwrap()
        })
        .collect();

    let mut window = build_window::<DataPoint>(&WindowConfig::Cyclic { size: 4, repeat: 2 }).unwrap();
    let presented = session
        .train_windowed(window.as_mut(), &mut points.clone().into_iter(), true)
        .unwrap();
    assert_eq!(presented, 8);
    assert_eq!(session.learner().examples_absorbed(), 8);

    let probs = session.learner().apply_model(session.suite(), &points[0]);
    assert!(probs[0][0] > probs[0][1]);
}
