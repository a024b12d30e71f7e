//! Feedback learning over session logs, and the shared model it evolves

mod handle;
mod learner;
mod log;
mod store;
mod worker;

pub use handle::ModelHandle;
pub use learner::{bounded_step, effectiveness_delta, FeedbackLearner};
pub use log::{Outcome, SessionLog};
pub use store::ModelStore;
pub use worker::{LearnerWorker, LearningTarget};
