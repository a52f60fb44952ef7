use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::Result;

/// A differentiable model whose parameters live outside of it, in a flat buffer.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Samples a fresh set of parameters for this model.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample from.
    ///
    /// # Returns
    /// A buffer of `size()` parameters.
    fn init_params<R: Rng>(&self, rng: &mut R) -> Result<Vec<f32>>;

    /// Makes a forward pass keeping the intermediate values needed by `backward`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Makes a forward pass without keeping any state, for inference.
    fn predict(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Accumulates the gradient of the loss into `grad` given the derivative of the loss with
    /// respect to the output of the last `forward` call.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer of the same size as `params`.
    /// * `d` - The derivative of the loss with respect to the model's output.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;
}
