mod lane;
mod trainer;

pub use lane::{BatchedStep, Lane};
pub use trainer::{DEFAULT_LOG_EVERY, ParallelTrainer, SUBJECT_LEARNING_RATE};
