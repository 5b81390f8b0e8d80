//! boxer-classifiers: online multi-discrimination text classification.
//!
//! Examples are sparse feature vectors over a shared `FeatureDictionary`,
//! labelled against a `Suite` of independent discriminations. Learners
//! (truncated gradient, exponentiated gradient and a frequency baseline)
//! are trained one example at a time, optionally through a repeating
//! training window, and `Scores` accumulates recall, precision and
//! likelihood statistics while scoring.
//!
//! The file adapters under `io` and the `Session` type tie these pieces
//! together for drivers such as the `boxer` CLI.
pub mod config;
pub mod data_point;
pub mod dictionary;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod preprocessing;
pub mod scores;
pub mod session;
pub mod suite;
pub mod training_window;
