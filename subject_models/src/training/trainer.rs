use std::num::NonZeroUsize;

use log::{debug, info};
use machine_learning::{MlErr, arch::loss::Mse, optimization::Adam};
use rand::Rng;

use super::{BatchedStep, Lane};
use crate::{
    Result,
    data::{DataGenerator, TRAINING_BATCH_COUNT},
    device::Executor,
    functions::SubjectFn,
    net::SubjectNet,
};

/// The learning rate of the subject networks' optimizers.
pub const SUBJECT_LEARNING_RATE: f32 = 0.01;

/// The amount of epochs between training progress logs when none is given.
pub const DEFAULT_LOG_EVERY: usize = 1000;

/// Trains many independent subject networks in lock-step.
///
/// Every network gets its own optimizer and its own dataset, generated once before training and
/// reused unchanged on every epoch. On each sub-batch index all networks are advanced once before
/// moving on to the next one.
pub struct ParallelTrainer<'e> {
    executor: &'e Executor,
    generator: DataGenerator<'e>,
    epochs: usize,
    learning_rate: f32,
    weight_decay: f32,
    batch_count: NonZeroUsize,
    log_every: NonZeroUsize,
}

impl<'e> ParallelTrainer<'e> {
    /// Creates a new `ParallelTrainer`.
    ///
    /// # Arguments
    /// * `executor` - Runs the per-network work.
    /// * `generator` - Generates the training data.
    /// * `epochs` - The amount of passes over the training data, there is no early stopping.
    /// * `weight_decay` - The weight decay of every optimizer.
    ///
    /// # Returns
    /// A new `ParallelTrainer` training on `TRAINING_BATCH_COUNT` sub-batches with a learning
    /// rate of `SUBJECT_LEARNING_RATE`.
    pub fn new(
        executor: &'e Executor,
        generator: DataGenerator<'e>,
        epochs: usize,
        weight_decay: f32,
    ) -> Self {
        Self {
            executor,
            generator,
            epochs,
            learning_rate: SUBJECT_LEARNING_RATE,
            weight_decay,
            batch_count: NonZeroUsize::new(TRAINING_BATCH_COUNT).unwrap_or(NonZeroUsize::MIN),
            log_every: NonZeroUsize::new(DEFAULT_LOG_EVERY).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_batch_count(mut self, batch_count: NonZeroUsize) -> Self {
        self.batch_count = batch_count;
        self
    }

    /// Sets how many epochs pass between progress logs.
    pub fn with_log_every(mut self, log_every: NonZeroUsize) -> Self {
        self.log_every = log_every;
        self
    }

    /// Trains every network on its paired function, updating their parameters in place.
    ///
    /// # Arguments
    /// * `nets` - The networks to train.
    /// * `fns` - The labeling function of each network, paired by index.
    /// * `rng` - Seeds the generation of the training data.
    ///
    /// # Returns
    /// An error if `nets` and `fns` differ in length or a training step fails.
    pub fn train<R: Rng>(
        &self,
        nets: &mut [SubjectNet],
        fns: &[SubjectFn],
        rng: &mut R,
    ) -> Result<()> {
        if nets.len() != fns.len() {
            return Err(MlErr::SizeMismatch {
                what: "labeling functions",
                got: fns.len(),
                expected: nets.len(),
            }
            .into());
        }

        let batch_count = self.batch_count.get();
        let mut optimizers: Vec<Adam> = nets
            .iter()
            .map(|net| {
                Adam::with_defaults(net.size(), self.learning_rate)
                    .with_weight_decay(self.weight_decay)
            })
            .collect();

        let datasets = self.generator.generate_many(fns, batch_count, rng)?;
        debug!(
            "generated {} training datasets of {batch_count} sub-batches",
            datasets.len()
        );

        let mut lanes: Vec<Lane> = nets
            .iter_mut()
            .zip(&datasets)
            .zip(&mut optimizers)
            .map(|((net, data), optimizer)| Lane::new(net, data, optimizer))
            .collect();

        let step = BatchedStep::new(self.executor, Mse);

        for epoch in 0..self.epochs {
            for batch_idx in 0..batch_count {
                let losses = step.advance(&mut lanes, batch_idx)?;

                if batch_idx == 0 && epoch % self.log_every.get() == 0 {
                    let mean = losses.iter().sum::<f32>() / losses.len().max(1) as f32;
                    info!("epoch {epoch} of {}: mean loss {mean}", self.epochs);
                    for (lane, loss) in losses.iter().enumerate() {
                        debug!(lane = lane, epoch = epoch; "lane loss {loss}");
                    }
                }
            }
        }

        info!("trained {} subject networks", lanes.len());
        Ok(())
    }
}
