//! Integration tests for the evaluation accumulator.

use boxer_classifiers::data_point::DataPoint;
use boxer_classifiers::scores::Scores;
use boxer_classifiers::suite::{ClassRef, CreationContext, Suite};

fn topic_suite() -> (Suite, ClassRef, ClassRef) {
    let mut suite = Suite::new("news");
    suite.add_discrimination("topic").unwrap();
    let a = suite.set_default_class("topic", "A").unwrap();
    let b = suite
        .add_class("topic", "B", true, CreationContext::Api)
        .unwrap()
        .unwrap();
    (suite, a, b)
}

/// Log-probabilities that make `pos` the argmax of a two-class row.
fn choose(pos: usize) -> Vec<Vec<f64>> {
    let mut row = vec![0.2f64.ln(), 0.2f64.ln()];
    row[pos] = 0.8f64.ln();
    vec![row]
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

#[test]
fn recall_and_precision_for_topic_scenario() {
    let (suite, a, b) = topic_suite();
    let mut scores = Scores::new();

    let mut p1 = DataPoint::new("p1", vec![(0, 1.0)]).unwrap();
    p1.add_class(a, &suite).unwrap();
    let mut p2 = DataPoint::new("p2", vec![(1, 1.0)]).unwrap();
    p2.add_class(b, &suite).unwrap();
    let mut p3 = DataPoint::new("p3", vec![(2, 1.0)]).unwrap();
    p3.add_class(b, &suite).unwrap();

    scores.eval_scores(&p1, &suite, &choose(0)).unwrap();
    scores.eval_scores(&p2, &suite, &choose(0)).unwrap();
    scores.eval_scores(&p3, &suite, &choose(1)).unwrap();

    assert_eq!((scores.oracle_count(0, 0), scores.oracle_count(0, 1)), (1, 2));
    assert_eq!((scores.chosen_count(0, 0), scores.chosen_count(0, 1)), (2, 1));
    assert_eq!((scores.tp_count(0, 0), scores.tp_count(0, 1)), (1, 1));
    assert_eq!(scores.recall(0, 0), Some(1.0));
    assert_eq!(scores.recall(0, 1), Some(0.5));
    assert_eq!(scores.precision(0, 0), Some(0.5));
    assert_eq!(scores.precision(0, 1), Some(1.0));
    assert!((scores.w_avg_recall(0).unwrap() - 2.0 / 3.0).abs() < 1e-12);

    let report = scores.scoring_report(&suite);
    assert!(report.contains("topic:A Recall 1/1=1.0000 Precision 1/2=0.5000"));
    assert!(report.contains("topic:B Recall 1/2=0.5000 Precision 1/1=1.0000"));
    assert!(scores
        .w_avg_recall_report(&suite)
        .contains("topic weighted recall 2/3=0.6667"));
}

#[test]
fn unlabelled_point_counts_against_default() {
    let (suite, _, _) = topic_suite();
    let mut scores = Scores::new();
    let p = DataPoint::new("p", vec![]).unwrap();
    scores.eval_scores(&p, &suite, &choose(1)).unwrap();
    assert_eq!(scores.oracle_count(0, 0), 1);
    assert_eq!(scores.chosen_count(0, 1), 1);
    assert_eq!(scores.tp_count(0, 0), 0);
}

#[test]
fn ties_go_to_the_first_class() {
    let (suite, _, _) = topic_suite();
    let mut scores = Scores::new();
    let p = DataPoint::new("p", vec![]).unwrap();
    scores
        .eval_scores(&p, &suite, &[vec![0.5f64.ln(), 0.5f64.ln()]])
        .unwrap();
    assert_eq!(scores.chosen_count(0, 0), 1);
}

#[test]
fn never_chosen_class_omits_ratio() {
    let (suite, a, _) = topic_suite();
    let mut scores = Scores::new();
    let mut p = DataPoint::new("p", vec![]).unwrap();
    p.add_class(a, &suite).unwrap();
    scores.eval_scores(&p, &suite, &choose(0)).unwrap();
    let report = scores.scoring_report(&suite);
    assert!(report.contains("topic:B Recall 0/0 Precision 0/0"));
}

// ---------------------------------------------------------------------------
// Likelihood
// ---------------------------------------------------------------------------

#[test]
fn likelihood_means() {
    let (suite, a, b) = topic_suite();
    let mut scores = Scores::new();
    let mut p1 = DataPoint::new("p1", vec![]).unwrap();
    p1.add_class(a, &suite).unwrap();
    let mut p2 = DataPoint::new("p2", vec![]).unwrap();
    p2.add_class(b, &suite).unwrap();
    scores.eval_scores(&p1, &suite, &choose(0)).unwrap();
    scores.eval_scores(&p2, &suite, &choose(0)).unwrap();

    let (log_lik, lin_lik) = scores.mean_likelihood(0).unwrap();
    assert!((log_lik - (0.8f64.ln() + 0.2f64.ln()) / 2.0).abs() < 1e-12);
    assert!((lin_lik - 0.5).abs() < 1e-12);
    assert!(scores.lik_report(&suite).starts_with("topic log-likelihood"));
}

// ---------------------------------------------------------------------------
// Schema changes
// ---------------------------------------------------------------------------

#[test]
fn delete_discr_removes_one_index_everywhere() {
    let mut suite = Suite::new("s");
    for (d, c) in [("first", "x"), ("second", "y"), ("third", "z")] {
        suite.add_discrimination(d).unwrap();
        suite.set_default_class(d, c).unwrap();
    }
    let p = DataPoint::new("p", vec![]).unwrap();
    let mut scores = Scores::new();
    scores
        .eval_scores(&p, &suite, &[vec![0.0], vec![0.0], vec![0.0]])
        .unwrap();
    suite.add_class("third", "w", true, CreationContext::Api).unwrap();
    scores
        .eval_scores(&p, &suite, &[vec![0.0], vec![0.0], vec![-2.0, -0.1]])
        .unwrap();

    for index in 0..3 {
        let mut copy = scores.clone();
        let mut schema = suite.clone();
        copy.delete_discr(index).unwrap();
        schema.delete_discrimination(index).unwrap();
        assert_eq!(copy.len(), 2);
        let survivors: Vec<usize> = (0..3).filter(|&i| i != index).collect();
        for (new, &old) in survivors.iter().enumerate() {
            assert_eq!(copy.oracle_count(new, 0), scores.oracle_count(old, 0));
            assert_eq!(copy.chosen_count(new, 1), scores.chosen_count(old, 1));
            assert_eq!(copy.scored_count(new), scores.scored_count(old));
            assert_eq!(
                schema.discrimination_at(new).unwrap().name(),
                suite.discrimination_at(old).unwrap().name()
            );
        }
    }
}
