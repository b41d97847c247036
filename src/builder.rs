//! Compiles a parsed [`Expr`] into a DAG of shared [`OpNode`]s (spec §4.3).

use crate::ast_node::{canonical_string, Expr};
use crate::node::{DataNode, OpNode};
use crate::registry::REGISTRY;
use crate::util::Log;
use crate::{Arg, BuildError, InitArgs, OperatorId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Only `Log::Verbose`-tagged messages print by default (and then only in
/// debug builds); raise a `BuildCtx`'s own threshold via a future
/// `set_log_level` hook to see `Default`/`Success` construction traces too.
const LOG_THRESHOLD: Log<()> = Log::Verbose(());

/// Maps a canonical expression string to the node already built for it, so
/// that two syntactically identical subexpressions anywhere in the tree
/// resolve to the same `Rc<dyn OpNode>` (spec §4.3 "common subexpression
/// sharing"). A [`crate::node::CombinedNode`] also borrows this map to seed
/// its named children before parsing its template, so `@name` placeholders
/// resolve to the externally supplied node rather than a fresh data node.
pub type OpExprMap = HashMap<String, Rc<dyn OpNode>>;

/// Per-build state threaded through every [`BuildCtx::build`] call for one
/// `create_tree` invocation.
pub struct BuildCtx {
    next_op_id: Cell<OperatorId>,
    pub init: InitArgs,
    pub sharing: RefCell<OpExprMap>,
    /// Every distinct input field encountered, by name, as its concrete
    /// [`DataNode`] rather than a trait object — so [`crate::tree::Tree`]
    /// can install each tick's values without downcasting.
    pub data_nodes: RefCell<HashMap<String, Rc<DataNode>>>,
}

impl BuildCtx {
    pub fn new(init: InitArgs) -> Self {
        BuildCtx {
            next_op_id: Cell::new(0),
            init,
            sharing: RefCell::new(HashMap::new()),
            data_nodes: RefCell::new(HashMap::new()),
        }
    }

    pub fn next_id(&self) -> OperatorId {
        let id = self.next_op_id.get();
        self.next_op_id.set(id + 1);
        id
    }

    /// Build `expr` into a node, reusing an already-built node for any
    /// subexpression whose canonical string has been seen before (spec
    /// §4.3's 7-step procedure):
    ///
    /// 1. Canonicalise `expr`.
    /// 2. Return the shared node if the canonical form is already in
    ///    [`Self::sharing`].
    /// 3. A bare field reference becomes (or reuses) a [`DataNode`].
    /// 4. A bare numeric literal becomes a constant node via the `const`
    ///    operator.
    /// 5. A bare string literal is rejected: [`BuildError::BareStringExpression`].
    /// 6. A call recursively builds its arguments (literal args pass through
    ///    as [`Arg`] values; node-shaped args are built first), looks up the
    ///    operator in the registry, and invokes its factory.
    /// 7. If the resulting node is a combined operator, invoke
    ///    [`OpNode::build_from_expression`] immediately so its delegate
    ///    subtree exists before the node is handed back to any caller.
    pub fn build(&self, expr: &Expr) -> Result<Rc<dyn OpNode>, BuildError> {
        let canonical = canonical_string(expr);
        if let Some(existing) = self.sharing.borrow().get(&canonical) {
            Log::Verbose(format!("sharing hit for `{canonical}`")).emit(&LOG_THRESHOLD);
            return Ok(Rc::clone(existing));
        }

        let node: Rc<dyn OpNode> = match expr {
            Expr::Field(name) => {
                let data = Rc::new(DataNode::new(self.next_id(), name.clone(), self.init.nstock));
                self.data_nodes
                    .borrow_mut()
                    .insert(name.clone(), Rc::clone(&data));
                data
            }
            Expr::Int(v) => self.build_constant(&canonical, *v as f64)?,
            Expr::Double(v) => self.build_constant(&canonical, *v)?,
            Expr::Str(_) => return Err(BuildError::BareStringExpression),
            Expr::Call { name, args } => {
                let built_args = args
                    .iter()
                    .map(|a| self.build_arg(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let factory = REGISTRY
                    .get(name.as_str())
                    .ok_or_else(|| BuildError::UnknownOperator(name.clone()))?;
                let node = (factory.build)(self.next_id(), &canonical, &built_args, &self.init)?;
                if node.is_combined() {
                    node.build_from_expression(self)?;
                }
                node
            }
        };

        Log::Verbose(format!("constructed op_id={} for `{canonical}`", node.op_id()))
            .emit(&LOG_THRESHOLD);
        self.sharing.borrow_mut().insert(canonical, Rc::clone(&node));
        Ok(node)
    }

    /// Builds `3.0`-style literal call arguments as operator parameters
    /// rather than as nodes of their own; only field references and calls
    /// recurse back through [`Self::build`].
    fn build_arg(&self, expr: &Expr) -> Result<Arg, BuildError> {
        match expr {
            Expr::Int(v) => Ok(Arg::Int(*v)),
            Expr::Double(v) => Ok(Arg::Double(*v)),
            Expr::Str(s) => Ok(Arg::String(s.clone())),
            Expr::Field(_) | Expr::Call { .. } => Ok(Arg::Node(self.build(expr)?)),
        }
    }

    fn build_constant(&self, canonical: &str, value: f64) -> Result<Rc<dyn OpNode>, BuildError> {
        let factory = REGISTRY
            .get("const")
            .expect("the const operator is always registered");
        (factory.build)(self.next_id(), canonical, &[Arg::Double(value)], &self.init)
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::parsing::parse_expr;

    fn ctx() -> BuildCtx {
        BuildCtx::new(InitArgs::new(3))
    }

    #[test]
    fn identical_subexpressions_share_one_node() {
        let ctx = ctx();
        let expr = parse_expr("add(ts_mean(@x,3), ts_mean(@x,3))").unwrap();
        let node = ctx.build(&expr).unwrap();
        let children = node.children();
        assert!(Rc::ptr_eq(&children[0], &children[1]));
    }

    #[test]
    fn unknown_operator_is_a_build_error() {
        let ctx = ctx();
        let expr = parse_expr("not_a_real_operator(@x)").unwrap();
        assert!(matches!(
            ctx.build(&expr),
            Err(BuildError::UnknownOperator(name)) if name == "not_a_real_operator"
        ));
    }

    #[test]
    fn bare_string_expression_is_rejected() {
        let ctx = ctx();
        let expr = parse_expr("\"hello\"").unwrap();
        assert_eq!(ctx.build(&expr).unwrap_err(), BuildError::BareStringExpression);
    }

    #[test]
    fn bare_numeric_literal_builds_a_constant_node() {
        let ctx = ctx();
        let expr = parse_expr("3.5").unwrap();
        let node = ctx.build(&expr).unwrap();
        assert_eq!(node.buffer_rc().borrow().as_slice(), &[3.5, 3.5, 3.5]);
    }
}
