use ndarray::{Array2, ArrayView2};

use super::LossFn;

/// Mean squared error loss function, averaged over every element of the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        (&y_pred - &y)
            .mapv(|x| x.powi(2))
            .mean()
            .unwrap_or_default()
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        (&y_pred - &y) * (2.0 / y_pred.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn mean_of_squares() {
        let y_pred = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![[1.0], [0.0], [3.0], [0.0]];

        // (0 + 4 + 0 + 16) / 4
        assert_eq!(Mse.loss(y_pred.view(), y.view()), 5.0);
    }

    #[test]
    fn derivative_is_scaled_residual() {
        let y_pred = array![[3.0], [1.0]];
        let y = array![[1.0], [1.0]];

        let d = Mse.loss_prime(y_pred.view(), y.view());
        assert_eq!(d, array![[2.0], [0.0]]);
    }

    #[test]
    fn empty_batch_has_zero_loss() {
        let empty = Array2::<f32>::zeros((0, 1));
        assert_eq!(Mse.loss(empty.view(), empty.view()), 0.0);
    }
}
