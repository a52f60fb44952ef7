use std::{num::NonZeroUsize, path::PathBuf};

use clap::{Parser, ValueEnum};

use crate::{
    Result, RunConfig, SubjectErr,
    config::DEFAULT_COUNT,
    data::{SUBJECT_BATCH_SIZE, TRAINING_BATCH_COUNT},
    device::Device,
    training::{DEFAULT_LOG_EVERY, SUBJECT_LEARNING_RATE},
};

/// Trains subject models, ie. the models that implement the labeling function.
#[derive(Parser, Debug)]
#[command(name = "train_subject_models", version, about, long_about = None)]
pub struct Args {
    /// Directory to which to save the models
    #[arg(long)]
    pub path: PathBuf,

    /// The number of models to train in parallel, bounded by the memory of the device
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    pub count: usize,

    /// The random seed to use. Should differ between runs of an experiment and be kept the same
    /// for each run across experiments
    #[arg(long)]
    pub seed: u64,

    /// The function to train the subject nets on, eg. "addition"
    #[arg(long = "fn_name")]
    pub fn_name: String,

    /// The number of epochs for which to train the models
    #[arg(long)]
    pub epochs: usize,

    /// Weight decay for the adam optimiser
    #[arg(long = "weight_decay", default_value_t = 0.)]
    pub weight_decay: f64,

    /// Learning rate for the adam optimiser
    #[arg(long = "lr", default_value_t = SUBJECT_LEARNING_RATE)]
    pub learning_rate: f32,

    /// Samples per training sub-batch
    #[arg(long = "batch_size", default_value_t = SUBJECT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Training sub-batches per network
    #[arg(long = "batch_count", default_value_t = TRAINING_BATCH_COUNT)]
    pub batch_count: usize,

    /// Where the networks are trained
    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    /// Threads for the parallel device, 0 for one per core
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Epochs between training progress logs
    #[arg(long = "log_every", default_value_t = DEFAULT_LOG_EVERY)]
    pub log_every: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Parallel,
}

impl Args {
    /// Turns the arguments into a `RunConfig`.
    ///
    /// # Returns
    /// An error if the function name is unknown or any of the values is out of range.
    pub fn into_config(self) -> Result<RunConfig> {
        let fn_name = self.fn_name.parse()?;

        let device = match self.device {
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Parallel => Device::CpuParallel {
                threads: self.threads,
            },
        };

        let config = RunConfig {
            path: self.path,
            count: non_zero("count", self.count)?,
            seed: self.seed,
            fn_name,
            epochs: self.epochs,
            weight_decay: self.weight_decay,
            learning_rate: self.learning_rate,
            batch_size: non_zero("batch_size", self.batch_size)?,
            batch_count: non_zero("batch_count", self.batch_count)?,
            device,
            log_every: non_zero("log_every", self.log_every)?,
        };

        config.validate()?;
        Ok(config)
    }
}

fn non_zero(what: &str, n: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(n).ok_or_else(|| SubjectErr::InvalidConfig(format!("{what} must be positive")))
}
