use super::OpNode;
use crate::{OperatorId, RequestIdx, Tensor, TensorRef, UpdateError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A leaf node bound to one input field (spec §4.4 "Data nodes").
///
/// Unlike every other node kind, a `DataNode` never computes anything: its
/// buffer is installed directly by [`crate::tree::Tree::update`] from the
/// caller's tick inputs. A field that is declared in an expression but never
/// installed (because the caller never supplies it) simply keeps returning
/// its initial `NaN`-filled buffer forever; `get_result` never errors on a
/// stale index the way the computed node kinds do, since there is nothing to
/// recompute.
#[derive(Debug)]
pub struct DataNode {
    op_id: OperatorId,
    field: String,
    canonical: String,
    buffer: TensorRef,
    current_idx: Cell<RequestIdx>,
}

impl DataNode {
    pub fn new(op_id: OperatorId, field: String, nstock: usize) -> Self {
        let canonical = format!("@{field}");
        DataNode {
            op_id,
            field,
            canonical,
            buffer: Rc::new(RefCell::new(Tensor::nan_filled(nstock))),
            current_idx: Cell::new(0),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Install this tick's observations, in place, and mark the node current
    /// as of `req`. Called only from `Tree::update`'s field-installation
    /// pass, never from the generic `get_result` recursion.
    pub fn set_data(&self, req: RequestIdx, values: &Tensor) {
        self.buffer.borrow_mut().copy_from_slice(values.as_slice());
        self.current_idx.set(req);
    }
}

impl OpNode for DataNode {
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
        Vec::new()
    }

    fn get_result(&self, _req: RequestIdx) -> Result<(), UpdateError> {
        Ok(())
    }

    fn is_data(&self) -> bool {
        true
    }

    fn has_state(&self) -> bool {
        true
    }

    fn save_state(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.current_idx.get().to_le_bytes());
        let buf = self.buffer.borrow();
        out.extend_from_slice(&(buf.len() as u32).to_le_bytes());
        for v in buf.as_slice() {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn load_state(&self, bytes: &[u8]) -> Result<usize, crate::CheckpointError> {
        use crate::CheckpointError;
        let mut cursor = 0usize;
        let idx_bytes = bytes.get(0..8).ok_or(CheckpointError::Truncated)?;
        self.current_idx
            .set(u64::from_le_bytes(idx_bytes.try_into().expect("8 bytes")));
        cursor += 8;
        let len_bytes = bytes.get(cursor..cursor + 4).ok_or(CheckpointError::Truncated)?;
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
        Ok(cursor)
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn starts_nan_filled_and_reports_field_name() {
        let node = DataNode::new(0, "open".to_string(), 3);
        assert_eq!(node.field(), "open");
        assert!(node.buffer_rc().borrow().as_slice().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn set_data_updates_buffer_without_reallocating() {
        let node = DataNode::new(0, "open".to_string(), 3);
        let before_ptr = node.buffer_rc().borrow().as_slice().as_ptr();
        node.set_data(1, &Tensor::from_vec(vec![1.0, 2.0, 3.0]));
        let after_ptr = node.buffer_rc().borrow().as_slice().as_ptr();
        assert_eq!(before_ptr, after_ptr);
        assert_eq!(node.buffer_rc().borrow().as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(node.current_idx(), 1);
    }

    #[test]
    fn get_result_never_errors_regardless_of_requested_index() {
        let node = DataNode::new(0, "open".to_string(), 1);
        assert!(node.get_result(0).is_ok());
        assert!(node.get_result(500).is_ok());
    }
}
