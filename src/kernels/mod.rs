//! Reference operator kernels (spec §2.1).
//!
//! A kernel is the pure computation behind a [`crate::node::UnaryNode`] or
//! [`crate::node::BinaryNode`]; the node itself only handles demand-pull
//! memoization and child recursion. Splitting the two lets a stateful kernel
//! (a rolling window) carry exactly the state it needs without the node
//! machinery knowing its shape.

mod arithmetic;
mod combined_ops;
mod cross_sectional;
mod math;
mod ts;

pub use arithmetic::{Add, Divide, Multiply, Subtract};
pub use combined_ops::register_combined_ops;
pub use cross_sectional::{CsDemean, CsRank};
pub use math::{Abs, Identity, Negative, Sqrt};
pub use ts::{TsDelay, TsMean, TsSum};

use crate::{CheckpointError, Tensor};

/// A one-argument kernel: `out[i] = f(input[i])`, or carries cross-tick state
/// such as a rolling window.
pub trait UnaryKernel: std::fmt::Debug {
    fn eval(&self, input: &Tensor, out: &mut Tensor, batch_per_day: usize);

    fn has_state(&self) -> bool {
        false
    }

    fn save_state(&self, out: &mut Vec<u8>) {
        let _ = out;
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        let _ = bytes;
        Ok(0)
    }

    fn on_day_begin(&self) {}

    fn on_day_end(&self) {}
}

/// A two-argument kernel: `out[i] = f(left[i], right[i])`.
pub trait BinaryKernel: std::fmt::Debug {
    fn eval(&self, left: &Tensor, right: &Tensor, out: &mut Tensor, batch_per_day: usize);

    fn has_state(&self) -> bool {
        false
    }

    fn save_state(&self, out: &mut Vec<u8>) {
        let _ = out;
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        let _ = bytes;
        Ok(0)
    }

    fn on_day_begin(&self) {}

    fn on_day_end(&self) {}
}

pub(crate) fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}
