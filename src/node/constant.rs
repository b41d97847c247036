use super::OpNode;
use crate::{OperatorId, RequestIdx, Tensor, TensorRef, UpdateError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A node whose buffer is the same scalar value on every lane, for every
/// tick (spec §2.1 `const`).
///
/// Built once at construction time and never recomputed: `get_result`
/// always succeeds and simply adopts the requested index, so a downstream
/// node that reads a constant never pays for the comparison against
/// `current_idx + 1`.
#[derive(Debug)]
pub struct ConstantNode {
    op_id: OperatorId,
    canonical: String,
    buffer: TensorRef,
    current_idx: Cell<RequestIdx>,
}

impl ConstantNode {
    pub fn new(op_id: OperatorId, canonical: String, value: f64, nstock: usize) -> Self {
        ConstantNode {
            op_id,
            canonical,
            buffer: Rc::new(RefCell::new(Tensor::broadcast(nstock, value))),
            current_idx: Cell::new(0),
        }
    }
}

impl OpNode for ConstantNode {
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

    fn get_result(&self, req: RequestIdx) -> Result<(), UpdateError> {
        self.current_idx.set(req);
        Ok(())
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn broadcasts_value_across_every_lane() {
        let node = ConstantNode::new(0, "3.0".to_string(), 3.0, 4);
        assert_eq!(node.buffer_rc().borrow().as_slice(), &[3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn get_result_always_succeeds() {
        let node = ConstantNode::new(0, "1.0".to_string(), 1.0, 1);
        assert!(node.get_result(100).is_ok());
        assert_eq!(node.current_idx(), 100);
    }
}
