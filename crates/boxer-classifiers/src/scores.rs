//! Evaluation accumulator.
//!
//! `Scores` keeps parallel per-discrimination arrays, indexed by the
//! discrimination's position in the suite and then by class position. The
//! arrays grow with the suite and only shrink through [`Scores::delete_discr`],
//! which must be applied together with `Suite::delete_discrimination` for the
//! same index.
use std::fmt::Write;

use crate::data_point::DataPoint;
use crate::error::{ClassifierError, Result};
use crate::math::{argmax_first, Array1};
use crate::suite::Suite;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scores {
    oracle_cnt: Vec<Array1<u64>>,
    chosen_cnt: Vec<Array1<u64>>,
    tp_cnt: Vec<Array1<u64>>,
    log_lik: Array1<f64>,
    lin_lik: Array1<f64>,
    lik_cnt: Array1<u64>,
}

/// `num/den=ratio`, or just `num/den` when the denominator is zero.
fn ratio(num: u64, den: u64) -> String {
    if den == 0 {
        format!("{}/{}", num, den)
    } else {
        format!("{}/{}={:.4}", num, den, num as f64 / den as f64)
    }
}

impl Scores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of discrimination slots currently tracked.
    pub fn len(&self) -> usize {
        self.oracle_cnt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracle_cnt.is_empty()
    }

    fn resize(&mut self, suite: &Suite) {
        let n = suite.discrimination_count();
        while self.oracle_cnt.len() < n {
            self.oracle_cnt.push(Array1::default());
            self.chosen_cnt.push(Array1::default());
            self.tp_cnt.push(Array1::default());
        }
        self.log_lik.grow_to(n);
        self.lin_lik.grow_to(n);
        self.lik_cnt.grow_to(n);
        for (i, discr) in suite.discriminations().iter().enumerate() {
            let k = discr.class_count();
            self.oracle_cnt[i].grow_to(k);
            self.chosen_cnt[i].grow_to(k);
            self.tp_cnt[i].grow_to(k);
        }
    }

    /// Accumulate one scored point.
    ///
    /// `log_probs` holds one row of class log-probabilities per
    /// discrimination, in suite order, as returned by
    /// `Learner::apply_model_log`. A discrimination for which the point has
    /// neither an explicit label nor a default class is skipped.
    pub fn eval_scores(&mut self, point: &DataPoint, suite: &Suite, log_probs: &[Vec<f64>]) -> Result<()> {
        if log_probs.len() != suite.discrimination_count() {
            return Err(ClassifierError::DimensionMismatch {
                what: "probability rows",
                index: log_probs.len(),
                bound: suite.discrimination_count(),
            });
        }
        for (discr, row) in suite.discriminations().iter().zip(log_probs) {
            if row.len() != discr.class_count() {
                return Err(ClassifierError::DimensionMismatch {
                    what: "probability columns",
                    index: row.len(),
                    bound: discr.class_count(),
                });
            }
        }

        self.resize(suite);
        for (i, (discr, row)) in suite.discriminations().iter().zip(log_probs).enumerate() {
            let Some(truth) = point.true_class(discr) else {
                continue;
            };
            let Some(chosen) = argmax_first(row) else {
                continue;
            };
            self.oracle_cnt[i][truth] += 1;
            self.chosen_cnt[i][chosen] += 1;
            if chosen == truth {
                self.tp_cnt[i][truth] += 1;
            }
            self.log_lik[i] += row[truth];
            self.lin_lik[i] += row[truth].exp();
            self.lik_cnt[i] += 1;
        }
        Ok(())
    }

    fn count(counts: &[Array1<u64>], discr: usize, class: usize) -> u64 {
        counts
            .get(discr)
            .and_then(|c| c.as_slice().get(class))
            .copied()
            .unwrap_or(0)
    }

    pub fn oracle_count(&self, discr: usize, class: usize) -> u64 {
        Self::count(&self.oracle_cnt, discr, class)
    }

    pub fn chosen_count(&self, discr: usize, class: usize) -> u64 {
        Self::count(&self.chosen_cnt, discr, class)
    }

    pub fn tp_count(&self, discr: usize, class: usize) -> u64 {
        Self::count(&self.tp_cnt, discr, class)
    }

    pub fn recall(&self, discr: usize, class: usize) -> Option<f64> {
        let den = self.oracle_count(discr, class);
        (den > 0).then(|| self.tp_count(discr, class) as f64 / den as f64)
    }

    pub fn precision(&self, discr: usize, class: usize) -> Option<f64> {
        let den = self.chosen_count(discr, class);
        (den > 0).then(|| self.tp_count(discr, class) as f64 / den as f64)
    }

    /// Total true positives over total oracle count for one discrimination;
    /// `None` if nothing was scored against it.
    pub fn w_avg_recall(&self, discr: usize) -> Option<f64> {
        let oracle = self.oracle_cnt.get(discr)?.sum();
        if oracle == 0 {
            return None;
        }
        Some(self.tp_cnt[discr].sum() as f64 / oracle as f64)
    }

    /// Mean log-likelihood and mean likelihood of the true class.
    pub fn mean_likelihood(&self, discr: usize) -> Option<(f64, f64)> {
        let n = *self.lik_cnt.as_slice().get(discr)?;
        if n == 0 {
            return None;
        }
        Some((self.log_lik[discr] / n as f64, self.lin_lik[discr] / n as f64))
    }

    pub fn scored_count(&self, discr: usize) -> u64 {
        self.lik_cnt.as_slice().get(discr).copied().unwrap_or(0)
    }

    fn discr_name(suite: &Suite, index: usize) -> String {
        suite
            .discrimination_at(index)
            .map(|d| d.name().to_string())
            .unwrap_or_else(|_| format!("[{}]", index))
    }

    /// Per-class recall and precision lines.
    pub fn scoring_report(&self, suite: &Suite) -> String {
        let mut out = String::new();
        for i in 0..self.len() {
            let discr = suite.discrimination_at(i).ok();
            for pos in 0..self.oracle_cnt[i].len() {
                let class = discr
                    .and_then(|d| d.class_at(pos).ok())
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| pos.to_string());
                let tp = self.tp_count(i, pos);
                let _ = writeln!(
                    out,
                    "{}:{} Recall {} Precision {}",
                    Self::discr_name(suite, i),
                    class,
                    ratio(tp, self.oracle_count(i, pos)),
                    ratio(tp, self.chosen_count(i, pos))
                );
            }
        }
        out
    }

    /// Weighted recall per discrimination, skipping those with no oracle
    /// counts.
    pub fn w_avg_recall_report(&self, suite: &Suite) -> String {
        let mut out = String::new();
        for i in 0..self.len() {
            let oracle = self.oracle_cnt[i].sum();
            if oracle == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "{} weighted recall {}",
                Self::discr_name(suite, i),
                ratio(self.tp_cnt[i].sum(), oracle)
            );
        }
        out
    }

    /// Mean log-likelihood and likelihood for discriminations with at least
    /// one scored point.
    pub fn lik_report(&self, suite: &Suite) -> String {
        let mut out = String::new();
        for i in 0..self.len() {
            if let Some((log_lik, lin_lik)) = self.mean_likelihood(i) {
                let _ = writeln!(
                    out,
                    "{} log-likelihood {:.6} likelihood {:.6} over {} point(s)",
                    Self::discr_name(suite, i),
                    log_lik,
                    lin_lik,
                    self.lik_cnt[i]
                );
            }
        }
        out
    }

    /// Drop the slot of the discrimination at `index`, shifting later slots
    /// down.
    pub fn delete_discr(&mut self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(ClassifierError::not_found("scores slot", index));
        }
        self.oracle_cnt.remove(index);
        self.chosen_cnt.remove(index);
        self.tp_cnt.remove(index);
        self.log_lik.remove(index);
        self.lin_lik.remove(index);
        self.lik_cnt.remove(index);
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Scores::default();
    }
}
