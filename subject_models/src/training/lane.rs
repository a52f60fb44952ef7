use machine_learning::{
    MlErr,
    arch::{Model, Network, Sequential, loss::LossFn},
    optimization::{Adam, Optimizer},
};

use crate::{Result, data::SubjectData, device::Executor};

/// One independent optimization trajectory: a network, the dataset it is trained on and the
/// state of its optimizer.
pub struct Lane<'a, M: Model = Sequential, O: Optimizer = Adam> {
    net: &'a mut Network<M>,
    data: &'a SubjectData,
    optimizer: &'a mut O,
}

impl<'a, M: Model, O: Optimizer> Lane<'a, M, O> {
    pub fn new(net: &'a mut Network<M>, data: &'a SubjectData, optimizer: &'a mut O) -> Self {
        Self {
            net,
            data,
            optimizer,
        }
    }

    /// Trains the lane's network on its `batch_idx`-th sub-batch.
    ///
    /// # Returns
    /// The loss of the sub-batch before the update.
    pub fn step<L: LossFn>(&mut self, batch_idx: usize, loss_fn: &L) -> Result<f32> {
        let (x, y) = self
            .data
            .batch(batch_idx)
            .ok_or(MlErr::SizeMismatch {
                what: "sub-batch index",
                got: batch_idx,
                expected: self.data.len(),
            })?;

        Ok(self.net.train_step(x, y, loss_fn, &mut *self.optimizer)?)
    }
}

/// Advances many lanes in lock-step, one sub-batch at a time.
///
/// Whether the lanes run one after the other or concurrently is up to the executor, the result
/// is the same either way since lanes share no state.
pub struct BatchedStep<'e, L: LossFn> {
    executor: &'e Executor,
    loss_fn: L,
}

impl<'e, L: LossFn + Sync> BatchedStep<'e, L> {
    pub fn new(executor: &'e Executor, loss_fn: L) -> Self {
        Self { executor, loss_fn }
    }

    /// Runs a single optimization step on every lane.
    ///
    /// # Arguments
    /// * `lanes` - The lanes to advance.
    /// * `batch_idx` - The sub-batch every lane is trained on.
    ///
    /// # Returns
    /// The loss of each lane, in lane order.
    pub fn advance<M, O>(&self, lanes: &mut [Lane<'_, M, O>], batch_idx: usize) -> Result<Vec<f32>>
    where
        M: Model + Send,
        O: Optimizer + Send,
    {
        self.executor
            .map(lanes, |lane| lane.step(batch_idx, &self.loss_fn))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use machine_learning::arch::loss::Mse;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        data::DataGenerator,
        device::Device,
        functions::{FnName, SubjectFn},
        net::{SubjectNet, subject_net},
    };

    fn setup(executor: &Executor) -> (Vec<SubjectNet>, Vec<SubjectData>, Vec<Adam>) {
        let mut rng = StdRng::seed_from_u64(5);
        let generator = DataGenerator::new(executor, NonZeroUsize::new(32).unwrap());
        let fns = [
            SubjectFn::new(FnName::Addition, 0.2),
            SubjectFn::new(FnName::Sigmoid, 0.7),
        ];

        let nets: Vec<_> = fns.iter().map(|_| subject_net(&mut rng).unwrap()).collect();
        let data = generator.generate_many(&fns, 3, &mut rng).unwrap();
        let optimizers = nets
            .iter()
            .map(|net| Adam::with_defaults(net.size(), 0.01))
            .collect();

        (nets, data, optimizers)
    }

    fn run(device: Device) -> Vec<SubjectNet> {
        let executor = Executor::new(device).unwrap();
        let (mut nets, data, mut optimizers) = setup(&executor);
        let before: Vec<Vec<f32>> = nets.iter().map(|net| net.params().to_vec()).collect();

        let mut lanes: Vec<Lane> = nets
            .iter_mut()
            .zip(&data)
            .zip(&mut optimizers)
            .map(|((net, data), optimizer)| Lane::new(net, data, optimizer))
            .collect();

        let step = BatchedStep::new(&executor, Mse);
        for batch_idx in 0..3 {
            let losses = step.advance(&mut lanes, batch_idx).unwrap();
            assert_eq!(losses.len(), 2);
            assert!(losses.iter().all(|loss| loss.is_finite()));
        }

        drop(lanes);
        for (net, before) in nets.iter().zip(&before) {
            assert_ne!(net.params(), before.as_slice());
        }

        nets
    }

    #[test]
    fn devices_agree() {
        let sequential = run(Device::Cpu);
        let parallel = run(Device::CpuParallel { threads: 2 });

        for (a, b) in sequential.iter().zip(&parallel) {
            assert_eq!(a.params(), b.params());
        }
    }

    #[test]
    fn out_of_range_batch() {
        let executor = Executor::new(Device::Cpu).unwrap();
        let (mut nets, data, mut optimizers) = setup(&executor);
        let mut lanes = vec![Lane::new(&mut nets[0], &data[0], &mut optimizers[0])];

        let step = BatchedStep::new(&executor, Mse);
        assert!(step.advance(&mut lanes, 3).is_err());
    }
}
