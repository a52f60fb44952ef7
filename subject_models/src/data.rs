use std::num::NonZeroUsize;

use log::debug;
use machine_learning::MlErr;
use ndarray::{Array2, Array4, ArrayView2, ArrayView4, Axis, s};
use ndarray_rand::RandomExt;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::Uniform;

use crate::{Result, device::Executor, functions::SubjectFn};

/// The amount of samples in every sub-batch of subject data.
///
/// Far from the memory limit of a single network, but the difference in training time against
/// the largest possible batch is small and it leaves room to train several networks at once.
pub const SUBJECT_BATCH_SIZE: usize = 1 << 15;

/// The amount of sub-batches generated for training.
pub const TRAINING_BATCH_COUNT: usize = 1 << 10;

/// The amount of sub-batches generated for evaluation.
pub const EVALUATION_BATCH_COUNT: usize = 1;

/// The upper (exclusive) limit of the sampled inputs, the lower one being 0.
pub const INPUT_RANGE: f32 = 10.;

/// A set of sub-batches pairing inputs with their labels.
///
/// The data is laid out as `(batch_count, 2, batch_size, 1)`, the second axis holding the inputs
/// at index 0 and the labels at index 1.
#[derive(Debug, Clone)]
pub struct SubjectData {
    data: Array4<f32>,
}

impl SubjectData {
    /// Returns the amount of sub-batches.
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Returns the amount of samples per sub-batch.
    pub fn batch_size(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Returns the `(inputs, labels)` of the `idx`-th sub-batch, each of shape `(batch_size, 1)`.
    pub fn batch(&self, idx: usize) -> Option<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        if idx >= self.len() {
            return None;
        }

        let batch = self.data.index_axis(Axis(0), idx);
        let x = batch.index_axis_move(Axis(0), 0);
        let y = batch.index_axis_move(Axis(0), 1);
        Some((x, y))
    }

    /// Iterates every sub-batch in order.
    pub fn batches(&self) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        (0..self.len()).filter_map(|idx| self.batch(idx))
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }
}

/// Generates synthetic data for the subject networks.
pub struct DataGenerator<'e> {
    executor: &'e Executor,
    batch_size: NonZeroUsize,
}

impl<'e> DataGenerator<'e> {
    /// Creates a new `DataGenerator`.
    ///
    /// # Arguments
    /// * `executor` - Runs the generation of different datasets.
    /// * `batch_size` - The amount of samples per sub-batch.
    pub fn new(executor: &'e Executor, batch_size: NonZeroUsize) -> Self {
        Self {
            executor,
            batch_size,
        }
    }

    /// Generates `batch_count` sub-batches of inputs drawn uniformly from `[0, 10)`, labeled by
    /// `f`.
    pub fn generate<R: Rng>(
        &self,
        f: &SubjectFn,
        batch_count: usize,
        rng: &mut R,
    ) -> Result<SubjectData> {
        let batch_size = self.batch_size.get();
        let uniform =
            Uniform::new(0., INPUT_RANGE).map_err(|e| MlErr::Distribution(e.to_string()))?;

        let x: Array2<f32> = Array2::random_using((batch_count, batch_size), uniform, rng);
        let y = f.apply(x.view());

        let mut data = Array4::zeros((batch_count, 2, batch_size, 1));
        data.slice_mut(s![.., 0, .., 0]).assign(&x);
        data.slice_mut(s![.., 1, .., 0]).assign(&y);

        debug!("generated {batch_count}x{batch_size} samples for {}", f.name());
        Ok(SubjectData { data })
    }

    /// Generates one dataset per function.
    ///
    /// Each dataset is drawn from its own generator seeded from `rng`, so the result does not
    /// depend on how the executor schedules the work.
    pub fn generate_many<R: Rng>(
        &self,
        fns: &[SubjectFn],
        batch_count: usize,
        rng: &mut R,
    ) -> Result<Vec<SubjectData>> {
        let mut jobs: Vec<(SubjectFn, StdRng)> = fns
            .iter()
            .map(|&f| (f, StdRng::seed_from_u64(rng.random())))
            .collect();

        self.executor
            .map(&mut jobs, |(f, rng)| self.generate(f, batch_count, rng))
    }
}
