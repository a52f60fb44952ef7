use std::{num::NonZeroUsize, path::PathBuf};

use crate::{
    Result, SubjectErr,
    data::{SUBJECT_BATCH_SIZE, TRAINING_BATCH_COUNT},
    device::Device,
    functions::FnName,
    training::{DEFAULT_LOG_EVERY, SUBJECT_LEARNING_RATE},
};

/// The amount of networks trained at once when none is given. About as many as fit in the
/// memory of a single device.
pub const DEFAULT_COUNT: usize = 5;

/// Everything a subject model training run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The directory the trained networks are saved to.
    pub path: PathBuf,
    /// The amount of networks trained at once.
    pub count: NonZeroUsize,
    pub seed: u64,
    pub fn_name: FnName,
    pub epochs: usize,
    pub weight_decay: f64,
    pub learning_rate: f32,
    pub batch_size: NonZeroUsize,
    pub batch_count: NonZeroUsize,
    pub device: Device,
    pub log_every: NonZeroUsize,
}

impl RunConfig {
    /// Creates a new `RunConfig` with default values for everything but the essentials.
    ///
    /// # Arguments
    /// * `path` - The directory the trained networks are saved to.
    /// * `fn_name` - The function every network is trained on.
    /// * `seed` - The seed of every random draw in the run.
    /// * `epochs` - The amount of training epochs.
    pub fn new<P: Into<PathBuf>>(path: P, fn_name: FnName, seed: u64, epochs: usize) -> Self {
        Self {
            path: path.into(),
            count: non_zero(DEFAULT_COUNT),
            seed,
            fn_name,
            epochs,
            weight_decay: 0.,
            learning_rate: SUBJECT_LEARNING_RATE,
            batch_size: non_zero(SUBJECT_BATCH_SIZE),
            batch_count: non_zero(TRAINING_BATCH_COUNT),
            device: Device::Cpu,
            log_every: non_zero(DEFAULT_LOG_EVERY),
        }
    }

    /// Checks the values the types alone can't guarantee.
    pub fn validate(&self) -> Result<()> {
        if !self.weight_decay.is_finite() || self.weight_decay < 0. {
            return Err(SubjectErr::InvalidConfig(format!(
                "weight decay must be a non-negative number, got {}",
                self.weight_decay
            )));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(SubjectErr::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }

        Ok(())
    }
}

fn non_zero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}
