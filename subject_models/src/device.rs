use std::fmt;

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::Result;

/// Where the per-network work of a run is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Every network is advanced one after the other on the calling thread.
    #[default]
    Cpu,
    /// Networks are advanced concurrently on a dedicated thread pool. A `threads` value of 0
    /// uses one thread per core.
    CpuParallel { threads: usize },
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::CpuParallel { threads: 0 } => write!(f, "cpu-parallel"),
            Device::CpuParallel { threads } => write!(f, "cpu-parallel({threads})"),
        }
    }
}

/// Runs independent per-network jobs on the configured `Device`.
pub struct Executor {
    pool: Option<ThreadPool>,
}

impl Executor {
    /// Creates a new `Executor`, spawning its thread pool if the device needs one.
    ///
    /// # Arguments
    /// * `device` - The device the jobs run on.
    ///
    /// # Returns
    /// A new `Executor` or an error if the thread pool could not be built.
    pub fn new(device: Device) -> Result<Self> {
        let pool = match device {
            Device::Cpu => None,
            Device::CpuParallel { threads } => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("subject-lane-{i}"))
                    .build()?;

                debug!("spawned {} lane threads", pool.current_num_threads());
                Some(pool)
            }
        };

        Ok(Self { pool })
    }

    /// Applies `f` to every item, returning the results in item order.
    ///
    /// # Returns
    /// Every result, or the first error produced by any of the jobs.
    pub fn map<T, R, F>(&self, items: &mut [T], f: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&mut T) -> Result<R> + Send + Sync,
    {
        match &self.pool {
            None => items.iter_mut().map(f).collect(),
            Some(pool) => pool.install(|| items.par_iter_mut().map(f).collect()),
        }
    }
}
