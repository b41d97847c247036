use super::OpNode;
use crate::builder::BuildCtx;
use crate::{BuildError, OperatorId, RequestIdx, TensorRef, UpdateError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A node expressed as a template over its own children rather than a
/// hand-written kernel (spec §4.6, e.g. `ts_demean`).
///
/// Construction happens in two phases, mirroring the C++ `GeneralCombOp`
/// this is grounded on: the factory builds a "shell" with the named
/// children and the `{param}`-substituted template string already
/// materialized, then [`OpNode::build_from_expression`] parses that template
/// and builds its DAG, seeding the builder's sharing map with the named
/// children so `@name` references in the template resolve to the externally
/// supplied nodes instead of fresh data nodes. The shell never computes
/// anything itself: every `OpNode` method delegates to the built subtree's
/// root, including the output buffer pointer, which is why a combined node's
/// buffer aliases its delegate's rather than copying into one of its own
/// (spec invariant 5).
pub struct CombinedNode {
    op_id: OperatorId,
    canonical: String,
    named_children: HashMap<String, Rc<dyn OpNode>>,
    template: String,
    delegate: RefCell<Option<Rc<dyn OpNode>>>,
}

impl CombinedNode {
    pub fn new(
        op_id: OperatorId,
        canonical: String,
        named_children: HashMap<String, Rc<dyn OpNode>>,
        template: String,
    ) -> Self {
        CombinedNode {
            op_id,
            canonical,
            named_children,
            template,
            delegate: RefCell::new(None),
        }
    }

    fn delegate(&self) -> Rc<dyn OpNode> {
        Rc::clone(
            self.delegate
                .borrow()
                .as_ref()
                .expect("build_from_expression runs immediately after construction"),
        )
    }
}

impl std::fmt::Debug for CombinedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedNode")
            .field("op_id", &self.op_id)
            .field("canonical", &self.canonical)
            .field("template", &self.template)
            .finish()
    }
}

impl OpNode for CombinedNode {
    fn op_id(&self) -> OperatorId {
        self.op_id
    }

    fn canonical(&self) -> &str {
        &self.canonical
    }

    fn buffer_rc(&self) -> TensorRef {
        self.delegate().buffer_rc()
    }

    fn current_idx(&self) -> RequestIdx {
        self.delegate().current_idx()
    }

    fn children(&self) -> Vec<Rc<dyn OpNode>> {
        vec![self.delegate()]
    }

    fn get_result(&self, req: RequestIdx) -> Result<(), UpdateError> {
        self.delegate().get_result(req)
    }

    fn is_combined(&self) -> bool {
        true
    }

    fn build_from_expression(&self, ctx: &BuildCtx) -> Result<(), BuildError> {
        for (name, node) in &self.named_children {
            ctx.sharing
                .borrow_mut()
                .insert(format!("@{name}"), Rc::clone(node));
        }
        let parsed = crate::parsing::parse_expr(&self.template)
            .expect("combined operator templates are authored internally, not user input");
        let root = ctx.build(&parsed)?;
        *self.delegate.borrow_mut() = Some(root);
        Ok(())
    }
}
