//! Error kinds returned at the API boundary (spec §7).
//!
//! Every kind here is recoverable: nothing in this module panics or aborts
//! evaluation on its own. A kernel that violates its own contract raises
//! [`UpdateError::Internal`], after which the tree is documented as unsafe to
//! continue using (the caller's only correct move is to drop it or reload
//! from the last checkpoint).

use thiserror::Error;

/// Malformed expression string; `offset` is a byte position into the source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token at byte {offset}: {message}")]
    UnexpectedToken { offset: usize, message: String },

    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid number literal at byte {offset}: {message}")]
    BadNumber { offset: usize, message: String },

    #[error("empty expression input")]
    EmptyInput,
}

/// Failure while compiling a parsed expression into operator nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{op}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        op: String,
        expected: usize,
        got: usize,
    },

    #[error("operator `{op}` argument {index} has wrong type: expected {expected}, got {got}")]
    TypeMismatch {
        op: String,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("a bare string literal cannot be used as an expression")]
    BareStringExpression,

    #[error("combined operator `{op}` template references unknown child `{child}`")]
    UnknownChild { op: String, child: String },
}

/// Caller-supplied tick inputs inconsistent with the compiled tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("no tree has been built; call create_tree first")]
    TreeNotBuilt,

    #[error("missing input field `{0}`")]
    MissingField(String),

    #[error("shape mismatch for field `{field}`: expected length {expected}, got {got}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        got: usize,
    },

    #[error("stale request: node expected tick {expected}, got {got}")]
    StaleRequest { expected: u64, got: u64 },

    #[error("internal operator invariant violated: {0}")]
    Internal(String),
}

/// The checkpoint file does not correspond to the current tree shape, or is
/// incomplete.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("checkpoint does not match current tree shape")]
    Mismatch,

    #[error("checkpoint file truncated")]
    Truncated,

    #[error("checkpoint version skew: expected {expected}, found {found}")]
    VersionSkew { expected: u32, found: u32 },
}

/// Failure from the underlying storage used by `save_checkpoint`/`load_checkpoint`.
#[derive(Debug, Error)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Unifying error returned from the [`crate::Tree`] facade.
#[derive(Debug, Error)]
pub enum FactorTreeError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Io(#[from] IoError),
}
