//! Process-wide operator registry (spec §4.2).
//!
//! Every operator name resolves to a [`Factory`] that validates its own
//! argument shape against the `Arg`s the builder already resolved, then
//! constructs the concrete node. Registration happens once, lazily, on
//! first lookup.

use crate::kernels::{
    register_combined_ops, Abs, Add, CsDemean, CsRank, Divide, Identity, Multiply, Negative, Sqrt,
    Subtract, TsDelay, TsMean, TsSum,
};
use crate::node::{BinaryNode, ConstantNode, OpNode, UnaryNode};
use crate::{Arg, ArgKind, BuildError, InitArgs, OperatorId};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::rc::Rc;

/// An operator's constructor: validates `args` against its own signature and
/// builds the node, given the `op_id` and materialized canonical string the
/// builder already assigned.
pub struct Factory {
    pub build: fn(OperatorId, &str, &[Arg], &InitArgs) -> Result<Rc<dyn OpNode>, BuildError>,
}

pub static REGISTRY: Lazy<HashMap<&'static str, Factory>> = Lazy::new(|| {
    let mut map = HashMap::new();
    register_builtins(&mut map);
    register_combined_ops(&mut map);
    map
});

fn expect_kind<'a>(
    op: &str,
    args: &'a [Arg],
    index: usize,
    kind: ArgKind,
) -> Result<&'a Arg, BuildError> {
    let arg = args.get(index).ok_or_else(|| BuildError::ArityMismatch {
        op: op.to_string(),
        expected: index + 1,
        got: args.len(),
    })?;
    if kind.matches(arg) {
        Ok(arg)
    } else {
        Err(BuildError::TypeMismatch {
            op: op.to_string(),
            index,
            expected: kind.label(),
            got: arg.kind().label(),
        })
    }
}

fn expect_arity(op: &str, args: &[Arg], expected: usize) -> Result<(), BuildError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(BuildError::ArityMismatch {
            op: op.to_string(),
            expected,
            got: args.len(),
        })
    }
}

macro_rules! unary_builtin {
    ($map:expr, $name:literal, $kernel:expr) => {
        $map.insert(
            $name,
            Factory {
                build: |op_id, canonical, args, init| {
                    expect_arity($name, args, 1)?;
                    let child = expect_kind($name, args, 0, ArgKind::Node)?
                        .as_node()
                        .expect("validated as Node")
                        .clone();
                    Ok(Rc::new(UnaryNode::new(
                        op_id,
                        canonical.to_string(),
                        Box::new($kernel),
                        child,
                        init,
                    )))
                },
            },
        );
    };
}

macro_rules! binary_builtin {
    ($map:expr, $name:literal, $kernel:expr) => {
        $map.insert(
            $name,
            Factory {
                build: |op_id, canonical, args, init| {
                    expect_arity($name, args, 2)?;
                    let left = expect_kind($name, args, 0, ArgKind::Node)?
                        .as_node()
                        .expect("validated as Node")
                        .clone();
                    let right = expect_kind($name, args, 1, ArgKind::Node)?
                        .as_node()
                        .expect("validated as Node")
                        .clone();
                    Ok(Rc::new(BinaryNode::new(
                        op_id,
                        canonical.to_string(),
                        Box::new($kernel),
                        left,
                        right,
                        init,
                    )))
                },
            },
        );
    };
}

fn register_builtins(map: &mut HashMap<&'static str, Factory>) {
    binary_builtin!(map, "add", Add);
    binary_builtin!(map, "subtract", Subtract);
    binary_builtin!(map, "multiply", Multiply);
    binary_builtin!(map, "divide", Divide);

    unary_builtin!(map, "identity", Identity);
    unary_builtin!(map, "abs", Abs);
    unary_builtin!(map, "negative", Negative);
    unary_builtin!(map, "sqrt", Sqrt);
    unary_builtin!(map, "cs_demean", CsDemean);
    unary_builtin!(map, "cs_rank", CsRank);

    map.insert(
        "ts_mean",
        Factory {
            build: |op_id, canonical, args, init| {
                expect_arity("ts_mean", args, 2)?;
                let child = expect_kind("ts_mean", args, 0, ArgKind::Node)?
                    .as_node()
                    .expect("validated as Node")
                    .clone();
                let window = expect_kind("ts_mean", args, 1, ArgKind::Int)?
                    .as_int()
                    .expect("validated as Int");
                Ok(Rc::new(UnaryNode::new(
                    op_id,
                    canonical.to_string(),
                    Box::new(TsMean::new(window as usize)),
                    child,
                    init,
                )))
            },
        },
    );

    map.insert(
        "ts_sum",
        Factory {
            build: |op_id, canonical, args, init| {
                expect_arity("ts_sum", args, 2)?;
                let child = expect_kind("ts_sum", args, 0, ArgKind::Node)?
                    .as_node()
                    .expect("validated as Node")
                    .clone();
                let window = expect_kind("ts_sum", args, 1, ArgKind::Int)?
                    .as_int()
                    .expect("validated as Int");
                Ok(Rc::new(UnaryNode::new(
                    op_id,
                    canonical.to_string(),
                    Box::new(TsSum::new(window as usize)),
                    child,
                    init,
                )))
            },
        },
    );

    map.insert(
        "ts_delay",
        Factory {
            build: |op_id, canonical, args, init| {
                expect_arity("ts_delay", args, 2)?;
                let child = expect_kind("ts_delay", args, 0, ArgKind::Node)?
                    .as_node()
                    .expect("validated as Node")
                    .clone();
                let lag = expect_kind("ts_delay", args, 1, ArgKind::Int)?
                    .as_int()
                    .expect("validated as Int");
                Ok(Rc::new(UnaryNode::new(
                    op_id,
                    canonical.to_string(),
                    Box::new(TsDelay::new(lag as usize)),
                    child,
                    init,
                )))
            },
        },
    );

    map.insert(
        "const",
        Factory {
            build: |op_id, canonical, args, init| {
                expect_arity("const", args, 1)?;
                let value = expect_kind("const", args, 0, ArgKind::Number)?
                    .as_number()
                    .expect("validated as Number");
                Ok(Rc::new(ConstantNode::new(
                    op_id,
                    canonical.to_string(),
                    value,
                    init.nstock,
                )))
            },
        },
    );
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn every_reference_kernel_is_registered() {
        for name in [
            "add", "subtract", "multiply", "divide", "identity", "abs", "negative", "sqrt",
            "cs_demean", "cs_rank", "ts_mean", "ts_sum", "ts_delay", "const", "ts_demean",
        ] {
            assert!(REGISTRY.contains_key(name), "missing operator: {name}");
        }
    }
}
