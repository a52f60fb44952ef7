use std::num::NonZeroUsize;

use rand::{SeedableRng, rngs::StdRng};
use subject_models::{
    data::DataGenerator,
    device::{Device, Executor},
    evaluation::Evaluator,
    functions::{FnName, SubjectFn},
    net::subject_net,
    training::ParallelTrainer,
};

#[test]
fn training_does_not_increase_the_held_out_loss() {
    let executor = Executor::new(Device::Cpu).unwrap();
    let batch_size = NonZeroUsize::new(128).unwrap();

    let fns: Vec<SubjectFn> = [0.1, 0.5, 0.9]
        .into_iter()
        .map(|param| SubjectFn::new(FnName::Addition, param))
        .collect();

    let mut rng = StdRng::seed_from_u64(3);
    let mut nets = (0..fns.len())
        .map(|_| subject_net(&mut rng).unwrap())
        .collect::<Vec<_>>();

    let evaluator = Evaluator::new(&executor, DataGenerator::new(&executor, batch_size));
    let before = evaluator
        .evaluate(&nets, &fns, &mut StdRng::seed_from_u64(99))
        .unwrap();

    ParallelTrainer::new(&executor, DataGenerator::new(&executor, batch_size), 100, 0.)
        .with_batch_count(NonZeroUsize::new(4).unwrap())
        .train(&mut nets, &fns, &mut rng)
        .unwrap();

    let after = evaluator
        .evaluate(&nets, &fns, &mut StdRng::seed_from_u64(99))
        .unwrap();

    for (before, after) in before.losses.iter().zip(&after.losses) {
        assert!(after <= before, "loss went from {before} to {after}");
    }
}
