use log::info;
use machine_learning::{MlErr, arch::loss::Mse};
use rand::Rng;

use crate::{
    Result,
    data::{DataGenerator, EVALUATION_BATCH_COUNT, SubjectData},
    device::Executor,
    functions::SubjectFn,
    net::SubjectNet,
};

/// The maximum amount of `(label, prediction)` pairs surfaced by an evaluation.
pub const SAMPLE_PREDICTIONS: usize = 10;

/// The outcome of evaluating a set of subject networks.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The held-out loss of each network, in network order.
    pub losses: Vec<f32>,
    /// Up to `SAMPLE_PREDICTIONS` `(label, prediction)` pairs of the last network.
    pub samples: Vec<(f32, f32)>,
}

/// Computes the held-out loss of subject networks on freshly generated data.
pub struct Evaluator<'e> {
    executor: &'e Executor,
    generator: DataGenerator<'e>,
}

impl<'e> Evaluator<'e> {
    pub fn new(executor: &'e Executor, generator: DataGenerator<'e>) -> Self {
        Self {
            executor,
            generator,
        }
    }

    /// Evaluates every network against a new batch labeled by its paired function.
    ///
    /// # Arguments
    /// * `nets` - The networks to evaluate, in inference mode.
    /// * `fns` - The labeling function of each network, paired by index.
    /// * `rng` - Seeds the generation of the evaluation data.
    ///
    /// # Returns
    /// The loss of every network and some sample predictions of the last one.
    pub fn evaluate<R: Rng>(
        &self,
        nets: &[SubjectNet],
        fns: &[SubjectFn],
        rng: &mut R,
    ) -> Result<Evaluation> {
        if nets.len() != fns.len() {
            return Err(MlErr::SizeMismatch {
                what: "labeling functions",
                got: fns.len(),
                expected: nets.len(),
            }
            .into());
        }

        let datasets = self
            .generator
            .generate_many(fns, EVALUATION_BATCH_COUNT, rng)?;

        let mut jobs: Vec<(&SubjectNet, &SubjectData)> = nets.iter().zip(&datasets).collect();
        let results = self.executor.map(&mut jobs, |&mut (net, data)| {
            let (x, y) = data.batch(0).ok_or(MlErr::SizeMismatch {
                what: "evaluation sub-batches",
                got: 0,
                expected: EVALUATION_BATCH_COUNT,
            })?;

            let (loss, y_pred) = net.evaluate(x, y, &Mse)?;
            let samples: Vec<(f32, f32)> = y
                .iter()
                .zip(y_pred.iter())
                .take(SAMPLE_PREDICTIONS)
                .map(|(&label, &prediction)| (label, prediction))
                .collect();

            Ok((loss, samples))
        })?;

        let (losses, mut samples): (Vec<f32>, Vec<Vec<(f32, f32)>>) = results.into_iter().unzip();
        let samples = samples.pop().unwrap_or_default();

        info!("evaluation losses: {losses:?}");
        info!("sample predictions (label, prediction)");
        for (label, prediction) in &samples {
            info!("{label} {prediction}");
        }

        Ok(Evaluation { losses, samples })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{device::Device, functions::FnName, net::subject_net};

    #[test]
    fn one_loss_per_network_in_order() {
        let executor = Executor::new(Device::Cpu).unwrap();
        let evaluator = Evaluator::new(
            &executor,
            DataGenerator::new(&executor, NonZeroUsize::new(64).unwrap()),
        );

        let mut rng = StdRng::seed_from_u64(2);
        let nets: Vec<_> = (0..3).map(|_| subject_net(&mut rng).unwrap()).collect();
        let fns = [
            SubjectFn::new(FnName::Addition, 0.9),
            SubjectFn::new(FnName::Min, 0.1),
            SubjectFn::new(FnName::Multiplication, 0.5),
        ];

        let evaluation = evaluator.evaluate(&nets, &fns, &mut rng).unwrap();

        assert_eq!(evaluation.losses.len(), 3);
        assert!(evaluation.losses.iter().all(|&l| l.is_finite() && l >= 0.));
        // x + 45 is much further from an untrained network than min(0.1, x)
        assert!(evaluation.losses[0] > evaluation.losses[1]);
        assert_eq!(evaluation.samples.len(), SAMPLE_PREDICTIONS);
    }

    #[test]
    fn small_batches_surface_fewer_samples() {
        let executor = Executor::new(Device::CpuParallel { threads: 2 }).unwrap();
        let evaluator = Evaluator::new(
            &executor,
            DataGenerator::new(&executor, NonZeroUsize::new(4).unwrap()),
        );

        let mut rng = StdRng::seed_from_u64(2);
        let nets = vec![subject_net(&mut rng).unwrap()];
        let fns = [SubjectFn::new(FnName::Exponent, 0.3)];

        let evaluation = evaluator.evaluate(&nets, &fns, &mut rng).unwrap();

        assert_eq!(evaluation.samples.len(), 4);
        for (label, _) in evaluation.samples {
            assert!((0. ..=10.0_f32.powf(0.15)).contains(&label));
        }
    }

    #[test]
    fn same_seed_same_losses() {
        let executor = Executor::new(Device::Cpu).unwrap();
        let evaluator = Evaluator::new(
            &executor,
            DataGenerator::new(&executor, NonZeroUsize::new(16).unwrap()),
        );

        let nets = vec![subject_net(&mut StdRng::seed_from_u64(1)).unwrap()];
        let fns = [SubjectFn::new(FnName::Sigmoid, 0.4)];

        let a = evaluator
            .evaluate(&nets, &fns, &mut StdRng::seed_from_u64(3))
            .unwrap();
        let b = evaluator
            .evaluate(&nets, &fns, &mut StdRng::seed_from_u64(3))
            .unwrap();

        assert_eq!(a, b);
    }
}
