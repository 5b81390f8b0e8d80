//! Train the three learners on synthetic sparse "documents" and print their
//! evaluation reports.
//!
//! Run with `RUST_LOG=info cargo run --example synthetic_topics`.
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use boxer_classifiers::config::{LearnerConfig, LearnerType, SuiteConfig, WindowConfig};
use boxer_classifiers::data_point::DataPoint;
use boxer_classifiers::session::{RawLabel, Session};
use boxer_classifiers::training_window::build_window;

const TOPICS: [&str; 3] = ["sports", "politics", "science"];
const WORDS_PER_TOPIC: usize = 20;
const SHARED_WORDS: usize = 30;

/// A document draws most of its words from its topic's vocabulary and the
/// rest from a shared pool.
fn synthetic_document(rng: &mut StdRng, topic: usize) -> Vec<(String, f64)> {
    let mut features: Vec<(String, f64)> = Vec::new();
    for _ in 0..12 {
        let word = if rng.gen_bool(0.7) {
            format!("{}_{}", TOPICS[topic], rng.gen_range(0..WORDS_PER_TOPIC))
        } else {
            format!("common_{}", rng.gen_range(0..SHARED_WORDS))
        };
        match features.iter_mut().find(|(w, _)| *w == word) {
            Some(entry) => entry.1 += 1.0,
            None => features.push((word, 1.0)),
        }
    }
    features
}

fn make_points(session: &mut Session, rng: &mut StdRng, n: usize, definitional: bool) -> Result<Vec<DataPoint>> {
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        let topic = rng.gen_range(0..TOPICS.len());
        let features = synthetic_document(rng, topic);
        let labels = [RawLabel::new(Some("topic"), TOPICS[topic])];
        points.push(session.make_point(None, &features, &labels, definitional)?);
    }
    Ok(points)
}

fn run(learner: LearnerConfig, window: &WindowConfig) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut session = Session::new(SuiteConfig::default(), learner)?;
    let train = make_points(&mut session, &mut rng, 600, true)?;
    session.commit_schema()?;
    let test = make_points(&mut session, &mut rng, 200, false)?;

    let mut window = build_window::<DataPoint>(window)?;
    session.train_windowed(window.as_mut(), &mut train.into_iter(), true)?;
    for point in &test {
        session.score(point)?;
    }

    println!("== {} ==", session.learner().describe());
    print!("{}", session.scores().w_avg_recall_report(session.suite()));
    print!("{}", session.scores().lik_report(session.suite()));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let window = WindowConfig::Cyclic { size: 30, repeat: 3 };
    run(
        LearnerConfig::new(
            0.1,
            LearnerType::TruncatedGradient {
                gravity: 0.001,
                theta: None,
                truncation_period: 10,
            },
        ),
        &window,
    )?;
    run(
        LearnerConfig::new(0.5, LearnerType::ExponentiatedGradient { total_weight: 2.0 }),
        &window,
    )?;
    run(LearnerConfig::new(0.1, LearnerType::Trivial {}), &WindowConfig::None)?;
    Ok(())
}
