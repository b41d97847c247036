//! The public facade over a compiled expression (spec §6).

use crate::builder::BuildCtx;
use crate::node::OpNode;
use crate::util::Log;
use crate::{checkpoint, parsing, FactorTreeError, InitArgs, RequestIdx, Tensor, TensorRef, UpdateError};
use std::collections::HashMap;
use std::rc::Rc;

/// Mirrors `builder::LOG_THRESHOLD`: day-boundary broadcasts are traced at
/// `Verbose` only, so they stay silent unless a future `set_log_level` hook
/// raises this threshold.
const LOG_THRESHOLD: Log<()> = Log::Verbose(());

/// A compiled expression, evaluated one tick at a time.
///
/// A `Tree` is built once via [`Tree::create_tree`] and then driven forward
/// with [`Tree::update`]; it has no facility for recompiling a different
/// expression in place; build a new `Tree` instead.
pub struct Tree {
    init: InitArgs,
    ctx: Option<BuildCtx>,
    root: Option<Rc<dyn OpNode>>,
    request_idx: RequestIdx,
}

impl Tree {
    /// An empty tree; call [`Tree::create_tree`] before [`Tree::update`].
    pub fn new(init: InitArgs) -> Self {
        Tree {
            init,
            ctx: None,
            root: None,
            request_idx: 0,
        }
    }

    /// Parse and compile `expression`, replacing any tree built previously.
    pub fn create_tree(&mut self, expression: &str) -> Result<(), FactorTreeError> {
        let parsed = parsing::parse_expr(expression)?;
        let ctx = BuildCtx::new(self.init);
        let root = ctx.build(&parsed)?;
        self.ctx = Some(ctx);
        self.root = Some(root);
        self.request_idx = 0;
        Ok(())
    }

    fn ctx(&self) -> Result<&BuildCtx, FactorTreeError> {
        self.ctx.as_ref().ok_or_else(|| UpdateError::TreeNotBuilt.into())
    }

    fn root(&self) -> Result<&Rc<dyn OpNode>, FactorTreeError> {
        self.root.as_ref().ok_or_else(|| UpdateError::TreeNotBuilt.into())
    }

    /// Advance the tree by one tick, installing `fields` as this tick's
    /// input observations and returning the root's output buffer.
    ///
    /// Every field is validated for length before any of them are installed
    /// (spec §8 scenario S5: a shape mismatch must leave the tree's prior
    /// state completely unchanged). A field name that matches no `@`
    /// reference anywhere in the compiled expression is silently ignored.
    pub fn update(&mut self, fields: HashMap<String, Tensor>) -> Result<TensorRef, FactorTreeError> {
        let ctx = self.ctx()?;
        let root = Rc::clone(self.root()?);
        let next_req = self.request_idx + 1;

        for (name, tensor) in &fields {
            if ctx.data_nodes.borrow().contains_key(name) && tensor.len() != self.init.nstock {
                return Err(UpdateError::ShapeMismatch {
                    field: name.clone(),
                    expected: self.init.nstock,
                    got: tensor.len(),
                }
                .into());
            }
        }

        for (name, tensor) in &fields {
            if let Some(node) = ctx.data_nodes.borrow().get(name) {
                node.set_data(next_req, tensor);
            }
        }

        root.get_result(next_req)?;
        self.request_idx = next_req;
        Ok(root.buffer_rc())
    }

    /// Broadcast a day-boundary-begin event to every distinct node in the
    /// DAG (spec §4.6), before the first `update` of a new trading day.
    pub fn on_day_begin(&self) -> Result<(), FactorTreeError> {
        let nodes = self.unique_nodes()?;
        Log::Verbose(format!("on_day_begin broadcast to {} node(s)", nodes.len()))
            .emit(&LOG_THRESHOLD);
        for node in nodes {
            node.on_day_begin();
        }
        Ok(())
    }

    /// Broadcast a day-boundary-end event to every distinct node in the DAG,
    /// after the last `update` of a trading day.
    pub fn on_day_end(&self) -> Result<(), FactorTreeError> {
        let nodes = self.unique_nodes()?;
        Log::Verbose(format!("on_day_end broadcast to {} node(s)", nodes.len()))
            .emit(&LOG_THRESHOLD);
        for node in nodes {
            node.on_day_end();
        }
        Ok(())
    }

    fn unique_nodes(&self) -> Result<Vec<Rc<dyn OpNode>>, FactorTreeError> {
        use std::collections::HashSet;
        let root = self.root()?;
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        let mut stack = vec![Rc::clone(root)];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.op_id()) {
                continue;
            }
            stack.extend(node.children());
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Serialize the whole DAG's state, for later restoration via
    /// [`Tree::load_checkpoint`] (spec §4.7).
    pub fn save_checkpoint(&self) -> Result<Vec<u8>, FactorTreeError> {
        let root = self.root()?;
        Ok(checkpoint::save(std::slice::from_ref(root), self.request_idx))
    }

    /// Restore this tree's state from a buffer produced by
    /// [`Tree::save_checkpoint`] against a tree compiled from the same
    /// expression. Evaluation resumes from the tick the checkpoint was taken
    /// at; the next [`Tree::update`] call continues forward from there.
    pub fn load_checkpoint(&mut self, bytes: &[u8]) -> Result<(), FactorTreeError> {
        let root = Rc::clone(self.root()?);
        let request_idx = checkpoint::load(std::slice::from_ref(&root), bytes)?;
        self.request_idx = request_idx;
        Ok(())
    }

    /// The canonical string form of the compiled expression, with each
    /// shared subexpression rendered once (spec §6).
    pub fn to_string(&self) -> Result<String, FactorTreeError> {
        Ok(self.root()?.canonical().to_string())
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    fn fields(pairs: &[(&str, Vec<f64>)]) -> HashMap<String, Tensor> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Tensor::from_vec(v.clone())))
            .collect()
    }

    #[test]
    fn ts_mean_over_three_ticks_produces_the_rolling_average() {
        let mut tree = Tree::new(InitArgs::new(3));
        tree.create_tree("ts_mean(@x, 3)").unwrap();

        tree.update(fields(&[("x", vec![1.0, 2.0, 3.0])])).unwrap();
        tree.update(fields(&[("x", vec![2.0, 3.0, 4.0])])).unwrap();
        let out = tree.update(fields(&[("x", vec![3.0, 4.0, 5.0])])).unwrap();

        assert_eq!(out.borrow().as_slice(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn update_before_create_tree_is_an_error() {
        let mut tree = Tree::new(InitArgs::new(1));
        assert!(matches!(
            tree.update(HashMap::new()),
            Err(FactorTreeError::Update(UpdateError::TreeNotBuilt))
        ));
    }

    #[test]
    fn shape_mismatch_leaves_prior_state_untouched() {
        let mut tree = Tree::new(InitArgs::new(2));
        tree.create_tree("ts_mean(@x, 2)").unwrap();
        tree.update(fields(&[("x", vec![1.0, 2.0])])).unwrap();

        let err = tree.update(fields(&[("x", vec![1.0, 2.0, 3.0])]));
        assert!(matches!(
            err,
            Err(FactorTreeError::Update(UpdateError::ShapeMismatch { .. }))
        ));

        let out = tree.update(fields(&[("x", vec![3.0, 4.0])])).unwrap();
        assert_eq!(out.borrow().as_slice(), &[2.0, 3.0]);
    }

    #[test]
    fn unreferenced_field_names_are_ignored() {
        let mut tree = Tree::new(InitArgs::new(1));
        tree.create_tree("@x").unwrap();
        let out = tree
            .update(fields(&[("x", vec![1.0]), ("unused", vec![99.0])]))
            .unwrap();
        assert_eq!(out.borrow().as_slice(), &[1.0]);
    }

    #[test]
    fn checkpoint_round_trip_preserves_window_state() {
        let mut tree = Tree::new(InitArgs::new(1));
        tree.create_tree("ts_mean(@x, 3)").unwrap();
        tree.update(fields(&[("x", vec![1.0])])).unwrap();
        tree.update(fields(&[("x", vec![2.0])])).unwrap();
        let bytes = tree.save_checkpoint().unwrap();

        let mut resumed = Tree::new(InitArgs::new(1));
        resumed.create_tree("ts_mean(@x, 3)").unwrap();
        resumed.load_checkpoint(&bytes).unwrap();

        let out = resumed.update(fields(&[("x", vec![3.0])])).unwrap();
        assert_eq!(out.borrow().as_slice(), &[2.0]);
    }

    #[test]
    fn to_string_renders_the_canonical_expression() {
        let mut tree = Tree::new(InitArgs::new(1));
        tree.create_tree("ts_mean(@x, 3)").unwrap();
        assert_eq!(tree.to_string().unwrap(), "ts_mean(@x,3)");
    }
}
