use super::BinaryKernel;
use crate::Tensor;

/// `left + right`, lane-wise. `NaN` on either side propagates.
#[derive(Debug, Default)]
pub struct Add;

impl BinaryKernel for Add {
    fn eval(&self, left: &Tensor, right: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = left[i] + right[i];
        }
    }
}

/// `left - right`, lane-wise.
#[derive(Debug, Default)]
pub struct Subtract;

impl BinaryKernel for Subtract {
    fn eval(&self, left: &Tensor, right: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = left[i] - right[i];
        }
    }
}

/// `left * right`, lane-wise.
#[derive(Debug, Default)]
pub struct Multiply;

impl BinaryKernel for Multiply {
    fn eval(&self, left: &Tensor, right: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = left[i] * right[i];
        }
    }
}

/// `left / right`, lane-wise. Division by zero produces `inf`/`NaN` per IEEE
/// 754, matching the rest of the kernel set's `NaN`-propagating contract
/// rather than raising an error.
#[derive(Debug, Default)]
pub struct Divide;

impl BinaryKernel for Divide {
    fn eval(&self, left: &Tensor, right: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        for i in 0..out.len() {
            out[i] = left[i] / right[i];
        }
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn add_sums_lanewise() {
        let left = Tensor::from_vec(vec![1.0, 2.0]);
        let right = Tensor::from_vec(vec![10.0, 20.0]);
        let mut out = Tensor::nan_filled(2);
        Add.eval(&left, &right, &mut out, 1);
        assert_eq!(out.as_slice(), &[11.0, 22.0]);
    }

    #[test]
    fn divide_by_zero_propagates_ieee_semantics() {
        let left = Tensor::from_vec(vec![1.0, -1.0, 0.0]);
        let right = Tensor::from_vec(vec![0.0, 0.0, 0.0]);
        let mut out = Tensor::nan_filled(3);
        Divide.eval(&left, &right, &mut out, 1);
        assert_eq!(out.as_slice()[0], f64::INFINITY);
        assert_eq!(out.as_slice()[1], f64::NEG_INFINITY);
        assert!(out.as_slice()[2].is_nan());
    }
}
