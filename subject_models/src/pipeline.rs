use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::{
    Result, RunConfig,
    data::DataGenerator,
    device::Executor,
    evaluation::{Evaluation, Evaluator},
    functions::SubjectFn,
    net::subject_net,
    persistence::{ArtifactStore, RunMetadata},
    training::ParallelTrainer,
};

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The identifier each network was saved under, in network order.
    pub ids: Vec<Uuid>,
    pub metadata: Vec<RunMetadata>,
    pub evaluation: Evaluation,
}

/// Draws the hidden parameter of every labeling function, uniformly from [0, 1).
///
/// # Arguments
/// * `rng` - The run's seeded generator, drawn from before anything else.
/// * `count` - The amount of parameters to draw.
pub fn draw_parameters<R: Rng>(rng: &mut R, count: usize) -> Vec<f64> {
    (0..count).map(|_| rng.random::<f64>()).collect()
}

/// Trains, evaluates and saves a batch of subject networks.
///
/// Every random draw of the run comes from a single generator seeded with `config.seed`, so two
/// runs with the same configuration produce the same networks.
///
/// # Arguments
/// * `config` - The run's configuration.
///
/// # Returns
/// The ids and metadata of the saved networks or the first error found along the way.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    let count = config.count.get();

    info!(
        "training {count} subject networks on {} with seed {} on {}",
        config.fn_name, config.seed, config.device
    );

    let store = ArtifactStore::open(&config.path)?;
    let executor = Executor::new(config.device)?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let parameters = draw_parameters(&mut rng, count);
    let fns: Vec<SubjectFn> = parameters
        .iter()
        .map(|&param| SubjectFn::new(config.fn_name, param))
        .collect();

    info!("initialising networks");
    let mut nets = (0..count)
        .map(|_| subject_net(&mut rng))
        .collect::<Result<Vec<_>>>()?;

    info!("training for {} epochs", config.epochs);
    ParallelTrainer::new(
        &executor,
        DataGenerator::new(&executor, config.batch_size),
        config.epochs,
        config.weight_decay as f32,
    )
    .with_learning_rate(config.learning_rate)
    .with_batch_count(config.batch_count)
    .with_log_every(config.log_every)
    .train(&mut nets, &fns, &mut rng)?;

    info!("evaluating");
    let evaluation = Evaluator::new(&executor, DataGenerator::new(&executor, config.batch_size))
        .evaluate(&nets, &fns, &mut rng)?;

    let metadata: Vec<RunMetadata> = parameters
        .iter()
        .zip(&evaluation.losses)
        .map(|(&parameter, &loss)| RunMetadata {
            fn_name: config.fn_name,
            parameter,
            loss: loss as f64,
            seed: config.seed,
            weight_decay: config.weight_decay,
            epochs: config.epochs,
        })
        .collect();

    let ids = nets
        .iter()
        .zip(&metadata)
        .map(|(net, metadata)| store.save(net, metadata))
        .collect::<Result<Vec<_>>>()?;

    info!("saved {} subject networks to {}", ids.len(), store.base().display());

    Ok(RunReport {
        ids,
        metadata,
        evaluation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_come_first_in_the_stream() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = draw_parameters(&mut rng, 3);

        let mut again = StdRng::seed_from_u64(11);
        let expected: Vec<f64> = (0..3).map(|_| again.random::<f64>()).collect();

        assert_eq!(params, expected);
        assert!(params.iter().all(|p| (0.0..1.0).contains(p)));
    }

    #[test]
    fn fewer_parameters_are_a_prefix() {
        let long = draw_parameters(&mut StdRng::seed_from_u64(2), 5);
        let short = draw_parameters(&mut StdRng::seed_from_u64(2), 2);

        assert_eq!(&long[..2], &short[..]);
    }
}
