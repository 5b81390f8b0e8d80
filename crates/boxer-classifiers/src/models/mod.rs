pub mod beta;
pub mod exponentiated_gradient;
pub mod factory;
pub mod learner_trait;
pub mod trivial;
pub mod truncated_gradient;

pub use beta::{BetaBlock, BetaSet, BlockState};
pub use factory::{build_learner, learner_from_state};
pub use learner_trait::{Learner, LearnerState};
