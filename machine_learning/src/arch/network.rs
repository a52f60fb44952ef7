use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Model, Sequential, loss::LossFn};
use crate::{MlErr, Result, optimization::Optimizer};

/// A model together with the parameters and gradient buffer it is trained with.
#[derive(Debug, Clone)]
pub struct Network<M: Model = Sequential> {
    model: M,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl<M: Model> Network<M> {
    /// Creates a new `Network` from an existing set of parameters.
    ///
    /// # Arguments
    /// * `model` - The architecture of the network.
    /// * `params` - The parameters, there should be exactly `model.size()` of them.
    ///
    /// # Returns
    /// A new `Network` or an error if the amount of parameters does not match the model.
    pub fn new(model: M, params: Vec<f32>) -> Result<Self> {
        let expected = model.size();
        if params.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected,
            });
        }

        Ok(Self {
            grad: vec![0.; expected],
            model,
            params,
        })
    }

    /// Creates a new `Network` with freshly initialized parameters.
    pub fn random<R: Rng>(model: M, rng: &mut R) -> Result<Self> {
        let params = model.init_params(rng)?;
        Self::new(model, params)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Returns the amount of parameters in the network.
    pub fn size(&self) -> usize {
        self.params.len()
    }

    /// Zeroes out the gradient buffer.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    /// Runs a single optimization step over one batch.
    ///
    /// # Arguments
    /// * `x` - The inputs of the batch.
    /// * `y` - The expected outputs of the batch.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the parameters.
    ///
    /// # Returns
    /// The loss of the batch before the update.
    pub fn train_step<L, O>(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        loss_fn: &L,
        optimizer: &mut O,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
    {
        self.zero_grad();

        let y_pred = self.model.forward(&self.params, x)?;
        let loss = loss_fn.loss(y_pred.view(), y);
        let d = loss_fn.loss_prime(y_pred.view(), y);

        self.model.backward(&self.params, &mut self.grad, d)?;
        optimizer.update_params(&self.grad, &mut self.params)?;

        Ok(loss)
    }

    /// Predicts the outputs for `x` without tracking anything for the backward pass.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.model.predict(&self.params, x)
    }

    /// Computes the loss of the network over a batch in inference mode.
    ///
    /// # Returns
    /// The loss and the predictions it was computed from.
    pub fn evaluate<L: LossFn>(
        &self,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        loss_fn: &L,
    ) -> Result<(f32, Array2<f32>)> {
        let y_pred = self.predict(x)?;
        let loss = loss_fn.loss(y_pred.view(), y);
        Ok((loss, y_pred))
    }
}
