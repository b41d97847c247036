use super::OpNode;
use crate::kernels::UnaryKernel;
use crate::{CheckpointError, InitArgs, OperatorId, RequestIdx, Tensor, TensorRef, UpdateError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A node computed from exactly one child's buffer through a [`UnaryKernel`]
/// (spec §4.4, §4.5).
pub struct UnaryNode {
    op_id: OperatorId,
    canonical: String,
    kernel: Box<dyn UnaryKernel>,
    child: Rc<dyn OpNode>,
    buffer: TensorRef,
    current_idx: Cell<RequestIdx>,
    batch_per_day: usize,
}

impl UnaryNode {
    pub fn new(
        op_id: OperatorId,
        canonical: String,
        kernel: Box<dyn UnaryKernel>,
        child: Rc<dyn OpNode>,
        init: &InitArgs,
    ) -> Self {
        UnaryNode {
            op_id,
            canonical,
            kernel,
            child,
            buffer: Rc::new(RefCell::new(Tensor::nan_filled(init.nstock))),
            current_idx: Cell::new(0),
            batch_per_day: init.batch_per_day,
        }
    }
}

impl std::fmt::Debug for UnaryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnaryNode")
            .field("op_id", &self.op_id)
            .field("canonical", &self.canonical)
            .finish()
    }
}

impl OpNode for UnaryNode {
    fn op_id(&self) -> OperatorId {
        self.op_id
    }

    fn canonical(&self) -> &str {
        &self.canonical
    }

    fn buffer_rc(&self) -> TensorRef {
        Rc::clone(&self.buffer)
    }

    fn current_idx(&self) -> RequestIdx {
        self.current_idx.get()
    }

    fn children(&self) -> Vec<Rc<dyn OpNode>> {
        vec![Rc::clone(&self.child)]
    }

    fn get_result(&self, req: RequestIdx) -> Result<(), UpdateError> {
        let current = self.current_idx.get();
        if current == req {
            return Ok(());
        }
        if current + 1 != req {
            return Err(UpdateError::StaleRequest {
                expected: current + 1,
                got: req,
            });
        }
        self.child.get_result(req)?;
        let child_buf = self.child.buffer_rc();
        let child_borrow = child_buf.borrow();
        let mut out = self.buffer.borrow_mut();
        self.kernel.eval(&child_borrow, &mut out, self.batch_per_day);
        drop(child_borrow);
        drop(out);
        self.current_idx.set(req);
        Ok(())
    }

    fn has_state(&self) -> bool {
        true
    }

    /// Always writes `current_idx` and the output buffer first, so a
    /// resumed node re-enters the demand-pull protocol at the same tick
    /// rather than raising `StaleRequest` on its first post-restore call;
    /// the kernel's own rolling-window state (if any) follows.
    fn save_state(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.current_idx.get().to_le_bytes());
        let buf = self.buffer.borrow();
        out.extend_from_slice(&(buf.len() as u32).to_le_bytes());
        for v in buf.as_slice() {
            out.extend_from_slice(&v.to_le_bytes());
        }
        drop(buf);
        if self.kernel.has_state() {
            self.kernel.save_state(out);
        }
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        let mut cursor = 0usize;
        let idx_bytes = bytes.get(0..8).ok_or(CheckpointError::Truncated)?;
        self.current_idx
            .set(u64::from_le_bytes(idx_bytes.try_into().expect("8 bytes")));
        cursor += 8;
        let len_bytes = bytes
            .get(cursor..cursor + 4)
            .ok_or(CheckpointError::Truncated)?;
        let len = u32::from_le_bytes(len_bytes.try_into().expect("4 bytes")) as usize;
        cursor += 4;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            let v_bytes = bytes
                .get(cursor..cursor + 8)
                .ok_or(CheckpointError::Truncated)?;
            values.push(f64::from_le_bytes(v_bytes.try_into().expect("8 bytes")));
            cursor += 8;
        }
        self.buffer.borrow_mut().copy_from_slice(&values);
        if self.kernel.has_state() {
            cursor += self.kernel.load_state(&bytes[cursor..])?;
        }
        Ok(cursor)
    }

    fn on_day_begin(&self) {
        self.kernel.on_day_begin()
    }

    fn on_day_end(&self) {
        self.kernel.on_day_end()
    }
}
