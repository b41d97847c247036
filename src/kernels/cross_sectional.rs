//! Cross-sectional operators: computed across the instrument axis of a
//! single tick, rather than across the tick axis like the `ts_*` kernels
//! (spec §1 "cross-sectional ... operators"; ported from the `CsDemean`/
//! `CsRank` members of `OperatorType` in
//! `original_source/include/factor_tree/operators/baseoperator.h`).
//!
//! Both kernels are stateless: unlike a `ts_*` kernel, which needs history
//! across ticks, a cross-sectional kernel only ever looks at the other
//! lanes of the *same* tick, so there is nothing to carry forward or
//! checkpoint.

use super::UnaryKernel;
use crate::Tensor;

/// `out[i] = in[i] - mean(in)`, the mean taken only over non-`NaN` lanes.
///
/// A lane that is itself `NaN` stays `NaN`; a `NaN` lane does not poison the
/// mean used for the other lanes (spec §3: "NaN is the sentinel for ... a
/// missing input"; excluding it rather than propagating keeps a single
/// missing instrument from blanking out the whole cross-section).
#[derive(Debug, Default)]
pub struct CsDemean;

fn valid_mean(input: &Tensor) -> f64 {
    let (sum, count) = input
        .as_slice()
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

impl UnaryKernel for CsDemean {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        let mean = valid_mean(input);
        for i in 0..out.len() {
            out[i] = if input[i].is_nan() { f64::NAN } else { input[i] - mean };
        }
    }
}

/// Fractional rank of each lane among the tick's non-`NaN` lanes, scaled to
/// `[0, 1]`; a single valid lane ranks `0.5`, matching the common
/// "ties get midpoint" convention. `NaN` lanes rank `NaN` and are excluded
/// from other lanes' rank computation.
#[derive(Debug, Default)]
pub struct CsRank;

impl UnaryKernel for CsRank {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        let values = input.as_slice();
        let valid_count = values.iter().filter(|v| !v.is_nan()).count();
        for i in 0..out.len() {
            if values[i].is_nan() {
                out[i] = f64::NAN;
                continue;
            }
            if valid_count == 1 {
                out[i] = 0.5;
                continue;
            }
            let less = values
                .iter()
                .filter(|v| !v.is_nan() && **v < values[i])
                .count();
            out[i] = less as f64 / (valid_count - 1) as f64;
        }
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn cs_demean_subtracts_the_cross_sectional_mean() {
        let input = Tensor::from_vec(vec![1.0, 2.0, 3.0]);
        let mut out = Tensor::nan_filled(3);
        CsDemean.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice(), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn cs_demean_excludes_nan_lanes_from_the_mean_but_keeps_them_nan() {
        let input = Tensor::from_vec(vec![1.0, f64::NAN, 3.0]);
        let mut out = Tensor::nan_filled(3);
        CsDemean.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice()[0], -1.0);
        assert!(out.as_slice()[1].is_nan());
        assert_eq!(out.as_slice()[2], 1.0);
    }

    #[test]
    fn cs_rank_orders_lanes_into_zero_to_one() {
        let input = Tensor::from_vec(vec![30.0, 10.0, 20.0]);
        let mut out = Tensor::nan_filled(3);
        CsRank.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice(), &[1.0, 0.0, 0.5]);
    }

    #[test]
    fn cs_rank_propagates_nan_and_ignores_it_for_other_lanes() {
        let input = Tensor::from_vec(vec![10.0, f64::NAN, 20.0]);
        let mut out = Tensor::nan_filled(3);
        CsRank.eval(&input, &mut out, 1);
        assert_eq!(out.as_slice()[0], 0.0);
        assert!(out.as_slice()[1].is_nan());
        assert_eq!(out.as_slice()[2], 1.0);
    }
}
