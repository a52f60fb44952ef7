use std::{fmt, str::FromStr};

use machine_learning::arch::activations::Sigmoid;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{Result, SubjectErr};

/// The names of the functions subject networks can be trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FnName {
    Addition,
    Multiplication,
    Sigmoid,
    Exponent,
    Min,
}

impl FnName {
    pub const ALL: [FnName; 5] = [
        FnName::Addition,
        FnName::Multiplication,
        FnName::Sigmoid,
        FnName::Exponent,
        FnName::Min,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FnName::Addition => "addition",
            FnName::Multiplication => "multiplication",
            FnName::Sigmoid => "sigmoid",
            FnName::Exponent => "exponent",
            FnName::Min => "min",
        }
    }
}

impl fmt::Display for FnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FnName {
    type Err = SubjectErr;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SubjectErr::InvalidFnName(s.to_string()))
    }
}

/// A labeling function: one of the registered functions with its parameter fixed.
///
/// Every function maps inputs in `[0, 10)` roughly onto `[0, 100]`.
#[derive(Debug, Clone, Copy)]
pub struct SubjectFn {
    name: FnName,
    param: f64,
}

impl SubjectFn {
    /// Creates a new `SubjectFn`.
    ///
    /// # Arguments
    /// * `name` - The function to implement.
    /// * `param` - The function's parameter, a value in `[0, 1)`.
    pub fn new(name: FnName, param: f64) -> Self {
        Self { name, param }
    }

    /// Looks up a function by name.
    ///
    /// # Returns
    /// The function or `SubjectErr::InvalidFnName` if there's no function with that name.
    pub fn from_name(name: &str, param: f64) -> Result<Self> {
        Ok(Self::new(name.parse()?, param))
    }

    pub fn name(&self) -> FnName {
        self.name
    }

    pub fn param(&self) -> f64 {
        self.param
    }

    /// Evaluates the function on a single input.
    pub fn eval(&self, x: f32) -> f32 {
        let c = self.param as f32;

        match self.name {
            FnName::Addition => x + c * 50.,
            FnName::Multiplication => x * c * 10.,
            FnName::Sigmoid => Sigmoid::new(20.).f(x + c) - 10.,
            FnName::Exponent => x.powf(c / 2.),
            FnName::Min => x.min(c),
        }
    }

    /// Evaluates the function element-wise over a batch.
    pub fn apply(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.mapv(|x| self.eval(x))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn addition() {
        let f = SubjectFn::new(FnName::Addition, 0.5);
        assert!(close(f.eval(2.), 27.));
    }

    #[test]
    fn multiplication() {
        let f = SubjectFn::new(FnName::Multiplication, 0.3);
        assert!(close(f.eval(4.), 12.));
    }

    #[test]
    fn sigmoid() {
        let f = SubjectFn::new(FnName::Sigmoid, 0.25);
        let expected = 20. * (1. / (1. + (-(3.0_f32 + 0.25)).exp()) - 0.5);
        assert!(close(f.eval(3.), expected));
        assert!(close(SubjectFn::new(FnName::Sigmoid, 0.).eval(0.), 0.));
    }

    #[test]
    fn exponent() {
        let f = SubjectFn::new(FnName::Exponent, 0.5);
        assert!(close(f.eval(9.), 9.0_f32.powf(0.25)));
        assert!(close(SubjectFn::new(FnName::Exponent, 0.).eval(7.), 1.));
    }

    #[test]
    fn min() {
        let f = SubjectFn::new(FnName::Min, 0.6);
        assert!(close(f.eval(0.2), 0.2));
        assert!(close(f.eval(8.), 0.6));
    }

    #[test]
    fn apply_is_element_wise() {
        let f = SubjectFn::new(FnName::Addition, 0.5);
        let y = f.apply(array![[0.], [1.], [2.]].view());
        assert_eq!(y, array![[25.], [26.], [27.]]);
    }

    #[test]
    fn names_round_trip() {
        for name in FnName::ALL {
            assert_eq!(name.as_str().parse::<FnName>().unwrap(), name);
        }
    }

    #[test]
    fn unknown_name_is_invalid() {
        assert!(matches!(
            SubjectFn::from_name("division", 0.5),
            Err(SubjectErr::InvalidFnName(name)) if name == "division"
        ));
    }
}
