//! Per-point prediction table.
//!
//! One TSV row per (point, discrimination): the chosen class, its
//! probability and the true class when known.
use std::io::Write;

use anyhow::Result;

use crate::data_point::DataPoint;
use crate::math::argmax_first;
use crate::suite::Suite;

pub struct PredictionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PredictionWriter<W> {
    pub fn new(output: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(output);
        writer.write_record(["name", "discrimination", "chosen", "probability", "truth"])?;
        Ok(PredictionWriter { writer })
    }

    /// Write the rows for one point. `log_probs` is the output of
    /// `Learner::apply_model_log` for `point`.
    pub fn write_point(&mut self, point: &DataPoint, suite: &Suite, log_probs: &[Vec<f64>]) -> Result<()> {
        for (discr, row) in suite.discriminations().iter().zip(log_probs) {
            let Some(chosen) = argmax_first(row) else {
                continue;
            };
            let truth = match point.true_class(discr) {
                Some(pos) => discr.class_at(pos)?.name().to_string(),
                None => String::new(),
            };
            let probability = format!("{:.6}", row[chosen].exp());
            self.writer.write_record([
                point.name(),
                discr.name(),
                discr.class_at(chosen)?.name(),
                probability.as_str(),
                truth.as_str(),
            ])?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer.into_inner().map_err(|e| e.into_error())?)
    }
}
