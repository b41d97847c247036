//! Combined operators: computed by expanding a template expression over
//! their own children rather than by a hand-written kernel (spec §4.6).

use crate::node::CombinedNode;
use crate::registry::Factory;
use crate::{Arg, ArgKind, BuildError};
use std::collections::HashMap;
use std::rc::Rc;

/// Registers every combined operator into the shared registry map. Kept
/// separate from [`super::super::registry::register_builtins`] since a
/// combined operator's factory materializes a template string instead of
/// constructing a kernel directly.
pub fn register_combined_ops(map: &mut HashMap<&'static str, Factory>) {
    map.insert(
        "ts_demean",
        Factory {
            build: |op_id, canonical, args, _init| {
                if args.len() != 2 {
                    return Err(BuildError::ArityMismatch {
                        op: "ts_demean".to_string(),
                        expected: 2,
                        got: args.len(),
                    });
                }
                let child_arg = &args[0];
                if !ArgKind::Node.matches(child_arg) {
                    return Err(BuildError::TypeMismatch {
                        op: "ts_demean".to_string(),
                        index: 0,
                        expected: "node",
                        got: child_arg.kind().label(),
                    });
                }
                let window_arg = &args[1];
                if !ArgKind::Int.matches(window_arg) {
                    return Err(BuildError::TypeMismatch {
                        op: "ts_demean".to_string(),
                        index: 1,
                        expected: "int",
                        got: window_arg.kind().label(),
                    });
                }
                let child = child_arg.as_node().expect("validated as Node").clone();
                let window = window_arg.as_int().expect("validated as Int");

                let child_key = format!("__ts_demean_child_{op_id}");
                let template =
                    format!("subtract(@{child_key}, ts_mean(@{child_key},{window}))");
                let mut named_children: HashMap<String, Rc<dyn crate::OpNode>> = HashMap::new();
                named_children.insert(child_key, child);

                Ok(Rc::new(CombinedNode::new(
                    op_id,
                    canonical.to_string(),
                    named_children,
                    template,
                )))
            },
        },
    );
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::builder::BuildCtx;
    use crate::parsing::parse_expr;
    use crate::InitArgs;

    #[test]
    fn ts_demean_builds_a_subtract_of_child_and_its_own_rolling_mean() {
        let ctx = BuildCtx::new(InitArgs::new(1));
        let expr = parse_expr("ts_demean(@x, 2)").unwrap();
        let node = ctx.build(&expr).unwrap();
        assert!(node.is_combined());
        assert_eq!(node.children().len(), 1);
    }
}
