use machine_learning::arch::{Network, Sequential, activations::ActFn, layers::Layer};
use rand::Rng;

use crate::Result;

/// The width of the hidden layers of the subject networks.
///
/// A grid search over widths 20 to 100 showed 25 performing close to the best widths while being
/// a fraction of their size.
pub const SUBJECT_LAYER_SIZE: usize = 25;

/// A trained or in-training subject network.
pub type SubjectNet = Network<Sequential>;

/// The fixed subject architecture: `1 -> 25 -> 25 -> 1` with ReLU activations between layers.
pub fn subject_architecture() -> Sequential {
    Sequential::new([
        Layer::dense((1, SUBJECT_LAYER_SIZE), Some(ActFn::relu())),
        Layer::dense((SUBJECT_LAYER_SIZE, SUBJECT_LAYER_SIZE), Some(ActFn::relu())),
        Layer::dense((SUBJECT_LAYER_SIZE, 1), None),
    ])
}

/// Builds a subject network with freshly sampled parameters.
pub fn subject_net<R: Rng>(rng: &mut R) -> Result<SubjectNet> {
    Ok(Network::random(subject_architecture(), rng)?)
}

/// Builds a subject network around an existing set of parameters.
pub fn subject_net_from_params(params: Vec<f32>) -> Result<SubjectNet> {
    Ok(Network::new(subject_architecture(), params)?)
}

#[cfg(test)]
mod tests {
    use machine_learning::arch::Model;
    use ndarray::Array2;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn has_expected_parameter_count() {
        assert_eq!(subject_architecture().size(), 726);
    }

    #[test]
    fn instances_are_independent() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = subject_net(&mut rng).unwrap();
        let b = subject_net(&mut rng).unwrap();

        assert_eq!(a.size(), b.size());
        assert_ne!(a.params(), b.params());
    }

    #[test]
    fn maps_scalars_to_scalars() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = subject_net(&mut rng).unwrap();

        let y = net.predict(Array2::zeros((7, 1)).view()).unwrap();
        assert_eq!(y.dim(), (7, 1));
    }
}
