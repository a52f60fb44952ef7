use super::Optimizer;
use crate::{MlErr, Result};

/// Adaptive moment estimation, with optional L2 weight decay folded into the gradient.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    weight_decay: f32,
    m: Box<[f32]>,
    v: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            weight_decay: 0.,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// Creates a new `Adam` optimizer with the usual `beta1 = 0.9`, `beta2 = 0.999` and
    /// `epsilon = 1e-8`.
    pub fn with_defaults(len: usize, learning_rate: f32) -> Self {
        Self::new(len, learning_rate, 0.9, 0.999, 1e-8)
    }

    /// Adds `weight_decay * param` to every gradient entry before the moment updates.
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(MlErr::SizeMismatch {
                what: "grad",
                got: grad.len(),
                expected: params.len(),
            });
        }

        if params.len() != self.m.len() {
            return Err(MlErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: self.m.len(),
            });
        }

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            weight_decay: wd,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let step_size = lr / (1. - self.beta1_t);
        let bc2_sqrt = (1. - self.beta2_t).sqrt();

        params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
            .for_each(|(((p, &g), m), v)| {
                let g = g + wd * *p;
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g.powi(2);
                *p -= step_size * *m / (v.sqrt() / bc2_sqrt + eps);
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::with_defaults(2, 0.01);
        let mut params = [1., -1.];

        adam.update_params(&[0.5, -3.], &mut params).unwrap();

        // the bias corrected first step is lr * sign(g)
        assert!((params[0] - 0.99).abs() < 1e-6);
        assert!((params[1] + 0.99).abs() < 1e-6);
    }

    #[test]
    fn weight_decay_pulls_towards_zero() {
        let mut adam = Adam::with_defaults(1, 0.01).with_weight_decay(0.5);
        let mut params = [2.];

        adam.update_params(&[0.], &mut params).unwrap();
        assert!(params[0] < 2.);
    }

    #[test]
    fn zero_gradient_without_decay_is_noop() {
        let mut adam = Adam::with_defaults(1, 0.01);
        let mut params = [2.];

        adam.update_params(&[0.], &mut params).unwrap();
        assert_eq!(params, [2.]);
    }

    #[test]
    fn size_mismatch() {
        let mut adam = Adam::with_defaults(2, 0.01);
        let mut params = [0.; 2];

        assert!(adam.update_params(&[0.; 3], &mut params).is_err());
        assert!(
            Adam::with_defaults(3, 0.01)
                .update_params(&[0.; 2], &mut params)
                .is_err()
        );
    }
}
