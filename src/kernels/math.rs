use super::UnaryKernel;
use crate::Tensor;

/// Passes its input through unchanged; mostly useful as a `CombinedNode`
/// template building block (`@child_data`) and in tests.
#[derive(Debug, Default)]
pub struct Identity;

impl UnaryKernel for Identity {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        out.copy_from_slice(input.as_slice());
    }
}

#[derive(Debug, Default)]
pub struct Abs;

impl UnaryKernel for Abs {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = input[i].abs();
        }
    }
}

#[derive(Debug, Default)]
pub struct Negative;

impl UnaryKernel for Negative {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = -input[i];
        }
    }
}

/// Negative inputs produce `NaN`, per `f64::sqrt`'s own IEEE 754 semantics.
#[derive(Debug, Default)]
pub struct Sqrt;

impl UnaryKernel for Sqrt {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = input[i].sqrt();
        }
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn abs_and_negative_and_sqrt() {
        let input = Tensor::from_vec(vec![4.0, -4.0]);
        let mut out = Tensor::nan_filled(2);
        Abs.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice(), &[4.0, 4.0]);
        Negative.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice(), &[-4.0, 4.0]);
        Sqrt.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice()[0], 2.0);
        assert!(out.as_slice()[1].is_nan());
    }
}
