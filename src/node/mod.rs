//! Operator DAG node kinds (spec §4.4–§4.6).
//!
//! Every node kind shares the same output representation: a `TensorRef`
//! (`Rc<RefCell<Tensor>>`) plus a monotone `current_idx`. This lets a
//! [`combined::CombinedNode`] alias its delegate's actual buffer pointer
//! (spec invariant 5) rather than copying into a buffer of its own.

mod binary;
mod combined;
mod constant;
mod data;
mod unary;

pub use binary::BinaryNode;
pub use combined::CombinedNode;
pub use constant::ConstantNode;
pub use data::DataNode;
pub use unary::UnaryNode;

use crate::builder::BuildCtx;
use crate::{BuildError, CheckpointError, OperatorId, RequestIdx, TensorRef, UpdateError};
use std::rc::Rc;

/// A single operator in the evaluation DAG.
///
/// Implementors are reached only through `Rc<dyn OpNode>`: the DAG shares
/// subtrees, so no node kind may assume unique ownership of its children.
pub trait OpNode: std::fmt::Debug {
    /// Stable identifier assigned at construction, used for diagnostics and
    /// checkpoint ordering.
    fn op_id(&self) -> OperatorId;

    /// The canonical expression string this node was built from (spec §4.1),
    /// used as the sharing key in [`crate::builder::OpExprMap`].
    fn canonical(&self) -> &str;

    /// The node's current output buffer. Cloning the returned `Rc` is cheap;
    /// a [`CombinedNode`] returns its delegate's buffer pointer directly.
    fn buffer_rc(&self) -> TensorRef;

    /// The request index this node's buffer currently reflects.
    fn current_idx(&self) -> RequestIdx;

    /// This node's direct children, in argument order.
    fn children(&self) -> Vec<Rc<dyn OpNode>>;

    /// Ensure this node's buffer reflects tick `req`, recursing into
    /// children as needed (spec §4.4's demand-pull protocol).
    ///
    /// Returns `Ok(())` if `current_idx() == req` already (cache hit) or if
    /// the node recomputed successfully. Returns
    /// [`UpdateError::StaleRequest`] if `req` skips ahead of
    /// `current_idx() + 1`.
    fn get_result(&self, req: RequestIdx) -> Result<(), UpdateError>;

    /// Whether this is a [`DataNode`] (affects field installation in
    /// [`crate::tree::Tree::update`]).
    fn is_data(&self) -> bool {
        false
    }

    /// Whether this is a [`CombinedNode`] (affects checkpoint node
    /// enumeration: a combined node's state lives entirely in its delegate).
    fn is_combined(&self) -> bool {
        false
    }

    /// Whether this node carries rolling-window or other cross-tick state
    /// that must be included in a checkpoint.
    fn has_state(&self) -> bool {
        false
    }

    /// Append this node's state to `out`, if any (spec §4.7).
    fn save_state(&self, out: &mut Vec<u8>) {
        let _ = out;
    }

    /// Restore this node's state from the front of `bytes`, returning the
    /// number of bytes consumed.
    fn load_state(&self, bytes: &[u8]) -> Result<usize, CheckpointError> {
        let _ = bytes;
        Ok(0)
    }

    /// Broadcast a day-boundary-begin event, deduplicated by `op_id` across
    /// the DAG (spec §4.6).
    fn on_day_begin(&self) {}

    /// Broadcast a day-boundary-end event, deduplicated by `op_id` across the
    /// DAG (spec §4.6).
    fn on_day_end(&self) {}

    /// Second construction phase for combined operators (spec §4.6): parse
    /// the materialized template and wire up the delegate subtree. A no-op
    /// for every other node kind.
    fn build_from_expression(&self, ctx: &BuildCtx) -> Result<(), BuildError> {
        let _ = ctx;
        Ok(())
    }
}
