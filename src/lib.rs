//! `factor-tree` compiles a quantitative factor expression into an incremental
//! operator DAG and evaluates it one tick at a time over a streaming panel of
//! per-instrument observations.
//!
//! # Overview
//!
//! A caller builds a [Tree] from an expression string such as
//! `ts_mean(@open, 5)`. The expression is parsed into a call tree
//! ([parsing]), compiled into a DAG of operator [node](node)s with common
//! subexpressions shared ([builder]), and then driven tick by tick through
//! [Tree::update]. Rolling-window state is carried by stateful operator
//! kernels ([kernels]) between ticks, and the whole tree can be serialized to
//! and restored from a binary checkpoint ([checkpoint]) so a long-lived
//! process can resume without recomputing history.
//!
//! # Example
//!
//! ```
//! use factor_tree::{InitArgs, Tensor, Tree};
//! use std::collections::HashMap;
//!
//! let mut tree = Tree::new(InitArgs::new(3));
//! tree.create_tree("ts_mean(@x, 3)").unwrap();
//!
//! let mut tick = |values: [f64; 3]| {
//!     let mut fields = HashMap::new();
//!     fields.insert("x".to_string(), Tensor::from_vec(values.to_vec()));
//!     tree.update(fields).unwrap()
//! };
//!
//! tick([1.0, 2.0, 3.0]);
//! tick([2.0, 3.0, 4.0]);
//! let out = tick([3.0, 4.0, 5.0]);
//! assert_eq!(out.borrow().as_slice(), &[2.0, 3.0, 4.0]);
//! ```
//!
//! # License
//! [factor_tree](crate) is provided under the MIT license.

mod ast_node;
mod builder;
mod checkpoint;
mod error;
pub mod kernels;
mod node;
mod parsing;
mod registry;
mod tensor;
mod tree;
mod util;

use std::rc::Rc;
use std::cell::RefCell;

pub use error::{BuildError, CheckpointError, FactorTreeError, IoError, ParseError, UpdateError};
pub use tensor::Tensor;
pub use tree::Tree;

pub use node::OpNode;

/// Monotone identifier assigned to every operator node in construction order.
///
/// Used only for diagnostics and for deterministic checkpoint ordering; it
/// carries no semantic meaning beyond uniqueness within a tree.
pub type OperatorId = usize;

/// Monotone counter identifying the current tick.
///
/// Advances by exactly one per successful [`Tree::update`] call; every node's
/// `current_idx` is compared against it to decide whether a cached result can
/// be reused.
pub type RequestIdx = u64;

/// A borrowed handle to a node's output buffer.
///
/// Cheap to clone (an `Rc` bump); reflects the node's most recent tick until
/// the next mutating call to [`Tree::update`].
pub type TensorRef = Rc<RefCell<Tensor>>;

/// Global, per-tree-lifetime configuration passed to every operator.
///
/// `nstock` fixes the width of every [`Tensor`] in the tree for its entire
/// life. `batch_per_day` is informational: the core never consults it, but it
/// is forwarded to every kernel so an intraday-window operator can use it if
/// its semantics call for it (see the open question in the design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitArgs {
    pub nstock: usize,
    pub batch_per_day: usize,
}

impl InitArgs {
    /// `batch_per_day` defaults to `1` when not otherwise specified.
    pub fn new(nstock: usize) -> Self {
        Self {
            nstock,
            batch_per_day: 1,
        }
    }

    pub fn with_batch_per_day(nstock: usize, batch_per_day: usize) -> Self {
        Self {
            nstock,
            batch_per_day,
        }
    }
}

/// A tagged argument passed to an operator factory.
///
/// Produced by the [builder] while walking a parsed expression: sub-expression
/// arguments resolve to already-built (possibly shared) [`Node`](Arg::Node)s,
/// while literal arguments pass their value straight through.
#[derive(Clone)]
pub enum Arg {
    Node(Rc<dyn OpNode>),
    Int(i64),
    Double(f64),
    String(String),
}

impl std::fmt::Debug for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Node(n) => write!(f, "Node({})", n.canonical()),
            Arg::Int(v) => write!(f, "Int({v})"),
            Arg::Double(v) => write!(f, "Double({v})"),
            Arg::String(v) => write!(f, "String({v:?})"),
        }
    }
}

impl Arg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Arg::Node(_) => ArgKind::Node,
            Arg::Int(_) => ArgKind::Int,
            Arg::Double(_) => ArgKind::Double,
            Arg::String(_) => ArgKind::String,
        }
    }

    pub fn as_node(&self) -> Option<&Rc<dyn OpNode>> {
        match self {
            Arg::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Returns an integer parameter; only `Int` args qualify.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a numeric parameter from either `Int` or `Double`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Arg::Int(v) => Some(*v as f64),
            Arg::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// The expected tag of one argument position in an operator's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Node,
    Int,
    Double,
    /// Accepts either `Int` or `Double` — used by operators like `const`
    /// whose scalar parameter may be written with or without a decimal point.
    Number,
    String,
}

impl ArgKind {
    pub fn matches(&self, arg: &Arg) -> bool {
        match (self, arg) {
            (ArgKind::Node, Arg::Node(_)) => true,
            (ArgKind::Int, Arg::Int(_)) => true,
            (ArgKind::Double, Arg::Double(_)) => true,
            (ArgKind::Number, Arg::Int(_)) | (ArgKind::Number, Arg::Double(_)) => true,
            (ArgKind::String, Arg::String(_)) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArgKind::Node => "node",
            ArgKind::Int => "int",
            ArgKind::Double => "double",
            ArgKind::Number => "number",
            ArgKind::String => "string",
        }
    }
}
