use super::UnaryKernel;
use crate::{CheckpointError, Tensor};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Per-lane rolling window shared by the `ts_*` kernels.
///
/// Lazily sized to the tensor width on first use (a kernel is constructed
/// before it has seen a tensor), then fixed for the kernel's lifetime.
#[derive(Debug, Default)]
struct Windows {
    lanes: Vec<VecDeque<f64>>,
}

impl Windows {
    fn ensure_width(&mut self, width: usize) {
        if self.lanes.is_empty() {
            self.lanes = (0..width).map(|_| VecDeque::new()).collect();
        }
    }

    fn save(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.lanes.len() as u32).to_le_bytes());
        for lane in &self.lanes {
            out.extend_from_slice(&(lane.len() as u32).to_le_bytes());
            for v in lane {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    fn load(&mut self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        let mut cursor = 0usize;
        let read_u32 = |bytes: &[u8], cursor: &mut usize| -> Result<u32, CheckpointError> {
            let slice = bytes
                .get(*cursor..*cursor + 4)
                .ok_or(CheckpointError::Truncated)?;
            *cursor += 4;
            Ok(u32::from_le_bytes(slice.try_into().expect("4 bytes")))
        };
        let lane_count = read_u32(bytes, &mut cursor)? as usize;
        let mut lanes = Vec::with_capacity(lane_count);
        for _ in 0..lane_count {
            let len = read_u32(bytes, &mut cursor)? as usize;
            let mut lane = VecDeque::with_capacity(len);
            for _ in 0..len {
                let slice = bytes
                    .get(cursor..cursor + 8)
                    .ok_or(CheckpointError::Truncated)?;
                cursor += 8;
                lane.push_back(f64::from_le_bytes(slice.try_into().expect("8 bytes")));
            }
            lanes.push(lane);
        }
        self.lanes = lanes;
        Ok(cursor)
    }
}

/// Trailing mean over the last `window` ticks, `NaN` until the window fills
/// (spec §2.1 `ts_mean`).
#[derive(Debug)]
pub struct TsMean {
    window: usize,
    windows: RefCell<Windows>,
}

impl TsMean {
    pub fn new(window: usize) -> Self {
        TsMean {
            window,
            windows: RefCell::new(Windows::default()),
        }
    }
}

impl UnaryKernel for TsMean {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        let mut windows = self.windows.borrow_mut();
        windows.ensure_width(input.len());
        for i in 0..out.len() {
            let lane = &mut windows.lanes[i];
            lane.push_back(input[i]);
            if lane.len() > self.window {
                lane.pop_front();
            }
            out[i] = if lane.len() == self.window {
                lane.iter().sum::<f64>() / self.window as f64
            } else {
                f64::NAN
            };
        }
    }

    fn has_state(&self) -> bool {
        true
    }

    fn save_state(&self, out: &mut Vec<u8>) {
        self.windows.borrow().save(out);
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        self.windows.borrow_mut().load(bytes)
    }
}

/// Trailing sum over the last `window` ticks, `NaN` until the window fills
/// (spec §2.1 `ts_sum`).
#[derive(Debug)]
pub struct TsSum {
    window: usize,
    windows: RefCell<Windows>,
}

impl TsSum {
    pub fn new(window: usize) -> Self {
        TsSum {
            window,
            windows: RefCell::new(Windows::default()),
        }
    }
}

impl UnaryKernel for TsSum {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        let mut windows = self.windows.borrow_mut();
        windows.ensure_width(input.len());
        for i in 0..out.len() {
            let lane = &mut windows.lanes[i];
            lane.push_back(input[i]);
            if lane.len() > self.window {
                lane.pop_front();
            }
            out[i] = if lane.len() == self.window {
                lane.iter().sum()
            } else {
                f64::NAN
            };
        }
    }

    fn has_state(&self) -> bool {
        true
    }

    fn save_state(&self, out: &mut Vec<u8>) {
        self.windows.borrow().save(out);
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        self.windows.borrow_mut().load(bytes)
    }
}

/// The value observed `lag` ticks ago, `NaN` until that much history exists
/// (spec §2.1 `ts_delay`).
#[derive(Debug)]
pub struct TsDelay {
    lag: usize,
    windows: RefCell<Windows>,
}

impl TsDelay {
    pub fn new(lag: usize) -> Self {
        TsDelay {
            lag,
            windows: RefCell::new(Windows::default()),
        }
    }
}

impl UnaryKernel for TsDelay {
    fn eval(&self, input: &Tensor, out: &mut Tensor, _batch_per_day: usize) {
        let mut windows = self.windows.borrow_mut();
        windows.ensure_width(input.len());
        for i in 0..out.len() {
            let lane = &mut windows.lanes[i];
            out[i] = if lane.len() == self.lag {
                lane[0]
            } else {
                f64::NAN
            };
            lane.push_back(input[i]);
            if lane.len() > self.lag {
                lane.pop_front();
            }
        }
    }

    fn has_state(&self) -> bool {
        true
    }

    fn save_state(&self, out: &mut Vec<u8>) {
        self.windows.borrow().save(out);
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        self.windows.borrow_mut().load(bytes)
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn ts_mean_is_nan_until_window_fills_then_rolls() {
        let kernel = TsMean::new(3);
        let mut out = Tensor::nan_filled(1);
        kernel.eval(&Tensor::from_vec(vec![1.0]), &mut out, 1);
        assert!(out.as_slice()[0].is_nan());
        kernel.eval(&Tensor::from_vec(vec![2.0]), &mut out, 1);
        assert!(out.as_slice()[0].is_nan());
        kernel.eval(&Tensor::from_vec(vec![3.0]), &mut out, 1);
        assert_eq!(out.as_slice()[0], 2.0);
        kernel.eval(&Tensor::from_vec(vec![6.0]), &mut out, 1);
        assert_eq!(out.as_slice()[0], (2.0 + 3.0 + 6.0) / 3.0);
    }

    #[test]
    fn ts_delay_round_trips_through_checkpoint_bytes() {
        let kernel = TsDelay::new(1);
        let mut out = Tensor::nan_filled(1);
        kernel.eval(&Tensor::from_vec(vec![10.0]), &mut out, 1);
        kernel.eval(&Tensor::from_vec(vec![20.0]), &mut out, 1);
        assert_eq!(out.as_slice()[0], 10.0);

        let mut bytes = Vec::new();
        kernel.save_state(&mut bytes);

        let restored = TsDelay::new(1);
        restored.load_state(&bytes).unwrap();
        let mut restored_out = Tensor::nan_filled(1);
        restored.eval(&Tensor::from_vec(vec![30.0]), &mut restored_out, 1);
        assert_eq!(restored_out.as_slice()[0], 20.0);
    }
}
